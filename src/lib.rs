//! # faqcat
//!
//! Categorization of FAQ and knowledge-base documents with an online
//! multinomial logistic regression over hashed token features.
//!
//! ## Features
//!
//! - Pluggable tokenization pipeline (tokenizer plus token filters)
//! - Stable category-id to slot mapping
//! - Feature hashing with configurable token weighting
//! - Lazily regularized SGD with per-term learning rates
//! - Repeated train/test evaluation with accuracy, calibration and MAP
//! - Checksummed binary persistence of models and category indexes

pub mod analysis;
pub mod category;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod ml;
pub mod persistence;

pub mod prelude {
    pub use crate::category::CategoryIndex;
    pub use crate::config::{ClassifierConfig, FaqcatConfig};
    pub use crate::document::{Document, DocumentSource, JsonDocumentSource};
    pub use crate::error::{FaqcatError, Result};
    pub use crate::ml::{CategoryClassifier, Evaluator, OnlineLogisticRegression, Trainer};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
