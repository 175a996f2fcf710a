//! Fitted tokenizer configurations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::token_filter::{LowercaseFilter, StemFilter, StopFilter};
use crate::analysis::tokenizer::{RegexTokenizer, UnicodeWordTokenizer};
use crate::error::{FaqcatError, Result};

/// Selects one of the fitted tokenizer / stop-word / stemmer combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerOption {
    /// `\w+` tokens, lowercased, English stop words removed, suffix-stemmed.
    Standard,
    /// Unicode word segments, lowercased, English stop words removed.
    #[default]
    UnicodeWords,
}

impl TokenizerOption {
    /// Build the analyzer for this option.
    pub fn analyzer(self) -> Result<PipelineAnalyzer> {
        let analyzer = match self {
            TokenizerOption::Standard => PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
                .add_filter(Arc::new(LowercaseFilter::new()))
                .add_filter(Arc::new(StopFilter::new()))
                .add_filter(Arc::new(StemFilter::new()))
                .with_name("standard"),
            TokenizerOption::UnicodeWords => {
                PipelineAnalyzer::new(Arc::new(UnicodeWordTokenizer::new()))
                    .add_filter(Arc::new(LowercaseFilter::new()))
                    .add_filter(Arc::new(StopFilter::new()))
                    .with_name("unicode_words")
            }
        };
        Ok(analyzer)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerOption::Standard => "standard",
            TokenizerOption::UnicodeWords => "unicode_words",
        }
    }
}

impl fmt::Display for TokenizerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenizerOption {
    type Err = FaqcatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "standard" => Ok(TokenizerOption::Standard),
            "unicode_words" | "unicode" => Ok(TokenizerOption::UnicodeWords),
            other => Err(FaqcatError::invalid_argument(format!(
                "Unknown tokenizer option: {other}"
            ))),
        }
    }
}

/// Tokenize `text` into the ordered, normalized token sequence for `option`.
///
/// Builds a fresh analyzer per call; hot loops should hold on to
/// [`TokenizerOption::analyzer`] instead.
pub fn tokenize(text: &str, option: TokenizerOption) -> Result<Vec<String>> {
    option.analyzer()?.analyze_to_strings(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_option() {
        let tokens = tokenize("Test text to teach machine.", TokenizerOption::Standard).unwrap();
        assert_eq!(tokens, vec!["test", "text", "teach", "machine"]);

        let tokens = tokenize(
            "Real document that can be really applied.",
            TokenizerOption::Standard,
        )
        .unwrap();
        assert_eq!(tokens, vec!["real", "docu", "can", "real", "appl"]);
    }

    #[test]
    fn test_unicode_words_option() {
        let tokens = tokenize("The invoices are Late!", TokenizerOption::UnicodeWords).unwrap();
        assert_eq!(tokens, vec!["invoices", "late"]);
        assert_eq!(TokenizerOption::default(), TokenizerOption::UnicodeWords);
    }

    #[test]
    fn test_parse_option() {
        assert_eq!(
            "standard".parse::<TokenizerOption>().unwrap(),
            TokenizerOption::Standard
        );
        assert_eq!(
            "unicode-words".parse::<TokenizerOption>().unwrap(),
            TokenizerOption::UnicodeWords
        );
        assert!("porter".parse::<TokenizerOption>().is_err());
        assert_eq!(TokenizerOption::Standard.to_string(), "standard");
    }
}
