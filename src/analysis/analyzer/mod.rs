//! Analyzers that combine a tokenizer with token filters.

mod analyzer;
mod option;
mod pipeline;

pub use analyzer::Analyzer;
pub use option::{TokenizerOption, tokenize};
pub use pipeline::PipelineAnalyzer;
