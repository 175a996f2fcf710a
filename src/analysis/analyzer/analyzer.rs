//! Core analyzer trait.
//!
//! An analyzer is the complete text pipeline used before feature encoding:
//!
//! ```text
//! Raw Text → Analyzer → Token Stream → FeatureEncoder
//!             ↓
//!         Tokenizer
//!             ↓
//!         Filter 1 .. Filter N
//! ```
//!
//! # Examples
//!
//! ```
//! use faqcat::analysis::Analyzer;
//! use faqcat::analysis::TokenizerOption;
//!
//! let analyzer = TokenizerOption::Standard.analyzer().unwrap();
//! let tokens: Vec<_> = analyzer.analyze("Resetting the Password").unwrap().collect();
//!
//! assert_eq!(tokens[0].text, "resett");
//! assert_eq!(tokens[1].text, "password");
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
///
/// Implementations must be `Send + Sync` so one analyzer can serve every
/// evaluation trial.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;

    /// Analyze the text and keep only the token strings, in order.
    fn analyze_to_strings(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }
}
