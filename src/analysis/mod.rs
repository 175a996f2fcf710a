//! Text analysis for faqcat.
//!
//! Turns raw document text into the ordered, normalized token sequence the
//! feature encoder consumes. A pipeline is a tokenizer followed by a chain of
//! token filters (lowercasing, stop-word removal, stemming); the two fitted
//! pipelines are selected with [`TokenizerOption`].
//!
//! ```text
//! Raw Text → Tokenizer → Lowercase → Stop → [Stem] → Vec<String>
//! ```

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, PipelineAnalyzer, TokenizerOption, tokenize};
pub use token::{Token, TokenStream};
pub use token_filter::Filter;
pub use tokenizer::Tokenizer;
