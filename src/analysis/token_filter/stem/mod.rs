//! Stemming token filter and the suffix-stripping stemmer.

use std::fmt;

use super::Filter;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for stemming algorithms.
pub trait Stemmer: Send + Sync {
    /// Stem a word to its root form.
    fn stem(&self, word: &str) -> String;

    /// Get the name of this stemmer.
    fn name(&self) -> &'static str;
}

/// English suffixes stripped by [`SuffixStemmer`], longest first.
const SUFFIXES: &[&str] = &[
    "tion", "sion", "able", "ible", "ment", "ness", "ing", "est", "ies", "ied", "ful", "ed", "er",
    "ly", "es", "s",
];

/// Stemmer that strips the first (longest) matching English suffix, leaving at
/// least three characters of stem. Words of three characters or fewer are kept.
#[derive(Debug, Clone, Default)]
pub struct SuffixStemmer;

impl SuffixStemmer {
    pub fn new() -> Self {
        SuffixStemmer
    }
}

impl Stemmer for SuffixStemmer {
    fn stem(&self, word: &str) -> String {
        let word = word.to_lowercase();

        if word.len() <= 3 {
            return word;
        }

        SUFFIXES
            .iter()
            .find(|suffix| word.len() > suffix.len() + 2 && word.ends_with(*suffix))
            .map(|suffix| word[..word.len() - suffix.len()].to_string())
            .unwrap_or(word)
    }

    fn name(&self) -> &'static str {
        "suffix"
    }
}

/// Filter that applies a [`Stemmer`] to every non-stopped token.
pub struct StemFilter {
    stemmer: Box<dyn Stemmer>,
}

impl fmt::Debug for StemFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StemFilter")
            .field("stemmer", &self.stemmer.name())
            .finish()
    }
}

impl StemFilter {
    /// Create a stem filter with the suffix stemmer.
    pub fn new() -> Self {
        StemFilter {
            stemmer: Box::new(SuffixStemmer::new()),
        }
    }

    /// Create a stem filter with a custom stemmer.
    pub fn with_stemmer(stemmer: Box<dyn Stemmer>) -> Self {
        StemFilter { stemmer }
    }
}

impl Default for StemFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StemFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let stemmed = tokens
            .map(|token| {
                if token.is_stopped() {
                    token
                } else {
                    let stem = self.stemmer.stem(&token.text);
                    token.with_text(stem)
                }
            })
            .collect::<Vec<_>>();

        Ok(Box::new(stemmed.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_suffix_stemmer() {
        let stemmer = SuffixStemmer::new();

        assert_eq!(stemmer.stem("running"), "runn");
        assert_eq!(stemmer.stem("flies"), "fli");
        assert_eq!(stemmer.stem("beautiful"), "beauti");
        assert_eq!(stemmer.stem("document"), "docu");
        assert_eq!(stemmer.stem("really"), "real");
        assert_eq!(stemmer.stem("applied"), "appl");
        assert_eq!(stemmer.stem("test"), "test");
        assert_eq!(stemmer.stem("can"), "can");
    }

    #[test]
    fn test_stem_filter_skips_stopped() {
        let filter = StemFilter::new();
        let tokens = vec![Token::new("happiness", 0), Token::new("tested", 1).stop()];

        let result: Vec<Token> = filter.filter(Box::new(tokens.into_iter())).unwrap().collect();

        assert_eq!(result[0].text, "happi");
        assert_eq!(result[1].text, "tested");
        assert_eq!(filter.name(), "stem");
    }
}
