//! Token sequences to hashed sparse feature vectors.
//!
//! Slot 0 of every vector holds the intercept (constant 1.0). Tokens are
//! hashed with 64-bit FNV-1a into the remaining `num_features - 1` slots;
//! collisions are accepted and colliding weights simply add up, as do repeated
//! occurrences of the same token.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{FaqcatError, Result};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a hash of the UTF-8 bytes of `token`.
pub fn fnv1a_64(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A sparse feature vector of fixed dimensionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureVectorParts")]
pub struct FeatureVector {
    size: usize,
    entries: BTreeMap<usize, f64>,
}

#[derive(Deserialize)]
struct FeatureVectorParts {
    size: usize,
    entries: BTreeMap<usize, f64>,
}

impl TryFrom<FeatureVectorParts> for FeatureVector {
    type Error = FaqcatError;

    fn try_from(parts: FeatureVectorParts) -> Result<Self> {
        if let Some(&index) = parts.entries.range(parts.size..).next().map(|(index, _)| index) {
            return Err(FaqcatError::invalid_argument(format!(
                "Feature index {index} out of range for {} features",
                parts.size
            )));
        }
        Ok(FeatureVector {
            size: parts.size,
            entries: parts.entries,
        })
    }
}

impl FeatureVector {
    /// An all-zero vector of dimensionality `size`.
    pub fn new(size: usize) -> Self {
        FeatureVector {
            size,
            entries: BTreeMap::new(),
        }
    }

    /// Build a vector from `(index, value)` pairs; values at equal indexes add.
    pub fn from_entries<I>(size: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut vector = Self::new(size);
        for (index, value) in entries {
            vector.add(index, value)?;
        }
        Ok(vector)
    }

    /// Add `value` to the entry at `index`.
    pub fn add(&mut self, index: usize, value: f64) -> Result<()> {
        if index >= self.size {
            return Err(FaqcatError::invalid_argument(format!(
                "Feature index {index} out of range for {} features",
                self.size
            )));
        }
        *self.entries.entry(index).or_insert(0.0) += value;
        Ok(())
    }

    pub fn get(&self, index: usize) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Dimensionality.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Stored entries in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(&index, &value)| (index, value))
    }

    /// Dot product with a dense row. The row must be at least `size` long.
    pub fn dot(&self, row: &[f64]) -> f64 {
        self.iter().map(|(index, value)| row[index] * value).sum()
    }

    /// Dense copy of the vector.
    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.size];
        for (index, value) in self.iter() {
            dense[index] = value;
        }
        dense
    }
}

/// Document frequencies over a corpus of token sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    num_documents: usize,
    document_frequency: HashMap<String, usize>,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count, for every token, how many of the token sequences contain it.
    pub fn from_token_sets<'a, I, T>(token_sets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoIterator<Item = &'a String>,
    {
        let mut stats = Self::new();
        for tokens in token_sets {
            stats.add_tokens(tokens);
        }
        stats
    }

    /// Statistics over the cached tokens of the documents.
    pub fn from_documents(documents: &[Document]) -> Self {
        Self::from_token_sets(documents.iter().map(|doc| doc.tokens()))
    }

    /// Register one more document.
    pub fn add_tokens<'a, T: IntoIterator<Item = &'a String>>(&mut self, tokens: T) {
        let distinct: HashSet<&String> = tokens.into_iter().collect();
        for token in distinct {
            *self.document_frequency.entry(token.clone()).or_insert(0) += 1;
        }
        self.num_documents += 1;
    }

    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    pub fn document_frequency(&self, token: &str) -> usize {
        self.document_frequency.get(token).copied().unwrap_or(0)
    }

    /// Smoothed inverse document frequency `ln((N + 1) / (df + 1)) + 1`.
    pub fn idf(&self, token: &str) -> f64 {
        let n = self.num_documents as f64;
        let df = self.document_frequency(token) as f64;
        ((n + 1.0) / (df + 1.0)).ln() + 1.0
    }
}

/// Weight contributed by one occurrence of `token` within `tokens`.
pub trait WeightFn: Send + Sync {
    fn weight(&self, token: &str, tokens: &[String], corpus: &CorpusStats) -> f64;

    /// Weight of every occurrence in `tokens`, in order. Implementations whose
    /// weights depend on the whole sequence override this to share the work.
    fn weights(&self, tokens: &[String], corpus: &CorpusStats) -> Vec<f64> {
        tokens
            .iter()
            .map(|token| self.weight(token, tokens, corpus))
            .collect()
    }
}

impl<F> WeightFn for F
where
    F: Fn(&str, &[String], &CorpusStats) -> f64 + Send + Sync,
{
    fn weight(&self, token: &str, tokens: &[String], corpus: &CorpusStats) -> f64 {
        self(token, tokens, corpus)
    }
}

/// Built-in token weightings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenWeighting {
    /// Every occurrence contributes the same value.
    Constant(f64),
    /// Every occurrence contributes `1 / len(tokens)`.
    TermFrequency,
    /// Boolean tf times smoothed idf, cosine-normalised over distinct tokens.
    TfIdf,
}

impl Default for TokenWeighting {
    fn default() -> Self {
        TokenWeighting::Constant(2.0)
    }
}

impl TokenWeighting {
    pub fn validate(&self) -> Result<()> {
        match self {
            TokenWeighting::Constant(value) if !value.is_finite() => Err(
                FaqcatError::invalid_config(format!("Constant token weight must be finite, got {value}")),
            ),
            _ => Ok(()),
        }
    }
}

impl WeightFn for TokenWeighting {
    fn weight(&self, token: &str, tokens: &[String], corpus: &CorpusStats) -> f64 {
        match *self {
            TokenWeighting::Constant(value) => value,
            TokenWeighting::TermFrequency => 1.0 / tokens.len().max(1) as f64,
            TokenWeighting::TfIdf => {
                let distinct: HashSet<&str> = tokens.iter().map(String::as_str).collect();
                let norm = distinct
                    .iter()
                    .map(|t| corpus.idf(t).powi(2))
                    .sum::<f64>()
                    .sqrt();
                let occurrences = tokens.iter().filter(|t| t.as_str() == token).count().max(1);
                if norm == 0.0 {
                    0.0
                } else {
                    corpus.idf(token) / norm / occurrences as f64
                }
            }
        }
    }

    fn weights(&self, tokens: &[String], corpus: &CorpusStats) -> Vec<f64> {
        if *self != TokenWeighting::TfIdf {
            return tokens
                .iter()
                .map(|token| self.weight(token, tokens, corpus))
                .collect();
        }

        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        for token in tokens {
            *occurrences.entry(token.as_str()).or_insert(0) += 1;
        }
        let norm = occurrences
            .keys()
            .map(|token| corpus.idf(token).powi(2))
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 {
            return vec![0.0; tokens.len()];
        }
        tokens
            .iter()
            .map(|token| {
                let count = occurrences.get(token.as_str()).copied().unwrap_or(1);
                corpus.idf(token) / norm / count as f64
            })
            .collect()
    }
}

/// Hashes tokens into a fixed-size feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    num_features: usize,
}

impl FeatureEncoder {
    /// Index reserved for the intercept term.
    pub const INTERCEPT: usize = 0;

    pub fn new(num_features: usize) -> Result<Self> {
        if num_features < 2 {
            return Err(FaqcatError::invalid_config(format!(
                "Feature space needs at least 2 slots, got {num_features}"
            )));
        }
        Ok(FeatureEncoder { num_features })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Feature index of `token`, never the intercept slot.
    pub fn index_of(&self, token: &str) -> usize {
        1 + (fnv1a_64(token) % (self.num_features as u64 - 1)) as usize
    }

    /// Encode `tokens` into a fresh vector holding the intercept plus the
    /// accumulated weight of every token occurrence.
    pub fn encode<W: WeightFn + ?Sized>(
        &self,
        tokens: &[String],
        weight_fn: &W,
        corpus: &CorpusStats,
    ) -> FeatureVector {
        let mut entries = BTreeMap::new();
        entries.insert(Self::INTERCEPT, 1.0);
        for (token, weight) in tokens.iter().zip(weight_fn.weights(tokens, corpus)) {
            *entries.entry(self.index_of(token)).or_insert(0.0) += weight;
        }
        FeatureVector {
            size: self.num_features,
            entries,
        }
    }
}
