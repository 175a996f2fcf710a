//! Error types for the faqcat library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`FaqcatError`] enum. Lookups of unknown categories, classification of an
//! untrained model and malformed feature vectors each have their own variant so
//! callers can tell recoverable conditions from programming errors.
//!
//! # Examples
//!
//! ```
//! use faqcat::error::{FaqcatError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(FaqcatError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for faqcat operations.
#[derive(Error, Debug)]
pub enum FaqcatError {
    /// A category id or slot that was never registered.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Classification was attempted before any training step.
    #[error("Classifier is not trained")]
    NotTrained,

    /// A feature vector whose size disagrees with the weight matrix.
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A training slot beyond the rows of a fixed-size model.
    #[error("Category slot {slot} exceeds the model capacity of {capacity} categories")]
    CategoryCapacity { capacity: usize, slot: usize },

    /// I/O errors (model files, datasets, configuration).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding, framing or checksum errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with FaqcatError.
pub type Result<T> = std::result::Result<T, FaqcatError>;

impl FaqcatError {
    /// Create a new category-not-found error.
    pub fn category_not_found<S: Into<String>>(category: S) -> Self {
        FaqcatError::CategoryNotFound(category.into())
    }

    /// Create a new dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        FaqcatError::DimensionMismatch { expected, actual }
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        FaqcatError::Serialization(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        FaqcatError::Analysis(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        FaqcatError::InvalidConfig(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FaqcatError::InvalidArgument(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        FaqcatError::Other(msg.into())
    }

    /// Whether callers are expected to recover from this error locally.
    ///
    /// Unknown categories are routine while the category set keeps growing and
    /// are usually converted to a probability of zero.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FaqcatError::CategoryNotFound(_))
    }
}
