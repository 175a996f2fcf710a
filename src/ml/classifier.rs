//! Category-level classifier API.
//!
//! [`CategoryClassifier`] ties together the pieces a caller otherwise wires by
//! hand: a [`CategoryIndex`] translating category ids to slots, the
//! [`FeatureEncoder`] with its token weighting and corpus statistics, and the
//! [`OnlineLogisticRegression`] weights. It speaks category ids and token
//! sequences, and refuses to classify before it has been trained.
//!
//! # Examples
//!
//! ```
//! use faqcat::config::ClassifierConfig;
//! use faqcat::ml::classifier::CategoryClassifier;
//!
//! # fn main() -> faqcat::error::Result<()> {
//! let mut classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 1024))?;
//! let alpha = vec!["alpha".to_string(), "report".to_string()];
//! let beta = vec!["beta".to_string(), "report".to_string()];
//!
//! for _ in 0..30 {
//!     classifier.train(&alpha, "A")?;
//!     classifier.train(&beta, "B")?;
//! }
//!
//! assert_eq!(classifier.most_confident_category(&alpha)?, "A");
//! assert_eq!(classifier.category_probability(&alpha, "unknown")?, 0.0);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::CategoryIndex;
use crate::config::{CategoryGrowth, ClassifierConfig};
use crate::document::Document;
use crate::error::{FaqcatError, Result};
use crate::ml::features::{CorpusStats, FeatureEncoder, FeatureVector, TokenWeighting};
use crate::ml::regression::{OnlineLogisticRegression, rank_by_probability};
use crate::persistence::{self, BlobKind};

/// Serialized classifier state: the model blob and the category index blob.
///
/// The model blob carries the weights together with the token weighting and
/// corpus statistics they were trained against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierBlobs {
    pub model: Vec<u8>,
    pub categories: Vec<u8>,
}

#[derive(Serialize)]
struct ClassifierStateRef<'a> {
    model: &'a OnlineLogisticRegression,
    weighting: TokenWeighting,
    corpus: &'a CorpusStats,
}

#[derive(Deserialize)]
struct ClassifierState {
    model: OnlineLogisticRegression,
    weighting: TokenWeighting,
    corpus: CorpusStats,
}

/// A trained (or trainable) document categorizer.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    index: CategoryIndex,
    model: OnlineLogisticRegression,
    encoder: FeatureEncoder,
    weighting: TokenWeighting,
    corpus: CorpusStats,
}

impl CategoryClassifier {
    /// An untrained classifier with an empty category index.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        Self::with_index(CategoryIndex::new(), config)
    }

    /// An untrained classifier over a pre-populated index. The model gets at
    /// least one row per registered category.
    pub fn with_index(index: CategoryIndex, mut config: ClassifierConfig) -> Result<Self> {
        config.num_categories = config.num_categories.max(index.size());
        let encoder = FeatureEncoder::new(config.num_features)?;
        let model = OnlineLogisticRegression::new(config)?;
        Ok(CategoryClassifier {
            index,
            model,
            encoder,
            weighting: TokenWeighting::default(),
            corpus: CorpusStats::new(),
        })
    }

    /// Size the model from a corpus scan: every label in `documents` is
    /// registered up front and the row count is exactly the number of distinct
    /// labels. Corpus statistics come from the documents' cached tokens.
    pub fn from_documents(documents: &[Document], mut config: ClassifierConfig) -> Result<Self> {
        let index = CategoryIndex::from_documents(documents);
        config.num_categories = index.size().max(1);
        let classifier = Self::with_index(index, config)?;
        Ok(classifier.with_corpus_stats(CorpusStats::from_documents(documents)))
    }

    /// Restore a classifier from its parts. Weighting and corpus statistics
    /// start at their defaults.
    pub fn from_parts(index: CategoryIndex, model: OnlineLogisticRegression) -> Result<Self> {
        let encoder = FeatureEncoder::new(model.num_features())?;
        Ok(CategoryClassifier {
            index,
            model,
            encoder,
            weighting: TokenWeighting::default(),
            corpus: CorpusStats::new(),
        })
    }

    pub fn with_weighting(mut self, weighting: TokenWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_corpus_stats(mut self, corpus: CorpusStats) -> Self {
        self.corpus = corpus;
        self
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    pub fn model(&self) -> &OnlineLogisticRegression {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut OnlineLogisticRegression {
        &mut self.model
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn weighting(&self) -> TokenWeighting {
        self.weighting
    }

    pub fn corpus_stats(&self) -> &CorpusStats {
        &self.corpus
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Encode tokens with this classifier's weighting and corpus statistics.
    pub fn encode(&self, tokens: &[String]) -> FeatureVector {
        self.encoder.encode(tokens, &self.weighting, &self.corpus)
    }

    /// Slot for `category_id`, registering it if it is new. A new category
    /// that a fixed-size model has no row for is rejected before it is
    /// registered.
    fn slot_for_training(&mut self, category_id: &str) -> Result<usize> {
        if let Some(slot) = self.index.get_slot(category_id) {
            return Ok(slot);
        }
        let next = self.index.size();
        if self.model.config().category_growth == CategoryGrowth::Fixed
            && next >= self.model.num_categories()
        {
            return Err(FaqcatError::CategoryCapacity {
                capacity: self.model.num_categories(),
                slot: next,
            });
        }
        self.index.add_category(category_id);
        Ok(next)
    }

    /// Train one step of `tokens` labeled `category_id`.
    pub fn train(&mut self, tokens: &[String], category_id: &str) -> Result<()> {
        let vector = self.encode(tokens);
        self.train_vector(&vector, category_id)
    }

    /// Train one step on an already encoded vector.
    pub fn train_vector(&mut self, vector: &FeatureVector, category_id: &str) -> Result<()> {
        let slot = self.slot_for_training(category_id)?;
        self.model.train_step(slot, vector)
    }

    fn ensure_trained(&self) -> Result<()> {
        if self.model.is_trained() {
            Ok(())
        } else {
            Err(FaqcatError::NotTrained)
        }
    }

    /// Probability per slot, in slot order.
    pub fn classify(&self, tokens: &[String]) -> Result<Vec<f64>> {
        self.ensure_trained()?;
        self.model.classify(&self.encode(tokens))
    }

    /// Up to `n` registered categories with their probabilities, most probable
    /// first. Equal probabilities keep slot order.
    pub fn top_categories(&self, tokens: &[String], n: usize) -> Result<Vec<(String, f64)>> {
        let probabilities = self.classify(tokens)?;
        Ok(rank_by_probability(&probabilities)
            .into_iter()
            .filter_map(|slot| {
                self.index
                    .category_of(slot)
                    .map(|id| (id.to_string(), probabilities[slot]))
            })
            .take(n)
            .collect())
    }

    /// The single most probable category id.
    pub fn most_confident_category(&self, tokens: &[String]) -> Result<String> {
        self.ensure_trained()?;
        let slot = self.model.predict_category(&self.encode(tokens))?;
        self.index
            .category_of(slot)
            .map(str::to_string)
            .ok_or_else(|| FaqcatError::category_not_found(format!("slot {slot}")))
    }

    /// Probability of `category_id`; 0.0 for categories never seen.
    pub fn category_probability(&self, tokens: &[String], category_id: &str) -> Result<f64> {
        self.ensure_trained()?;
        match self.index.slot_of(category_id) {
            Ok(slot) => self.model.probability_of(&self.encode(tokens), slot),
            Err(e) if e.is_recoverable() => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Serialize model and category index as two independent blobs.
    pub fn to_bytes(&self) -> Result<ClassifierBlobs> {
        let state = ClassifierStateRef {
            model: &self.model,
            weighting: self.weighting,
            corpus: &self.corpus,
        };
        Ok(ClassifierBlobs {
            model: persistence::encode_serde(BlobKind::Classifier, &state)?,
            categories: self.index.persist()?,
        })
    }

    pub fn from_bytes(blobs: &ClassifierBlobs) -> Result<Self> {
        let state: ClassifierState = persistence::decode_serde(BlobKind::Classifier, &blobs.model)?;
        state.model.validate_state()?;
        state
            .weighting
            .validate()
            .map_err(|e| FaqcatError::serialization(format!("Invalid persisted weighting: {e}")))?;
        let index = CategoryIndex::load(&blobs.categories)?;
        Ok(Self::from_parts(index, state.model)?
            .with_weighting(state.weighting)
            .with_corpus_stats(state.corpus))
    }

    /// Write the model and the category index to their own files.
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, model_path: P, categories_path: Q) -> Result<()> {
        let blobs = self.to_bytes()?;
        persistence::write_file(model_path, &blobs.model)?;
        persistence::write_file(categories_path, &blobs.categories)
    }

    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, categories_path: Q) -> Result<Self> {
        let blobs = ClassifierBlobs {
            model: persistence::read_file(model_path)?,
            categories: persistence::read_file(categories_path)?,
        };
        Self::from_bytes(&blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_not_trained() {
        let classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 64)).unwrap();
        let query = tokens("anything");
        assert!(matches!(classifier.classify(&query), Err(FaqcatError::NotTrained)));
        assert!(matches!(
            classifier.most_confident_category(&query),
            Err(FaqcatError::NotTrained)
        ));
        assert!(matches!(
            classifier.category_probability(&query, "x"),
            Err(FaqcatError::NotTrained)
        ));
    }

    #[test]
    fn test_capacity_checked_before_registration() {
        let mut classifier =
            CategoryClassifier::new(ClassifierConfig::with_dimensions(1, 64)).unwrap();
        classifier.train(&tokens("one"), "first").unwrap();

        let err = classifier.train(&tokens("two"), "second").unwrap_err();
        assert!(matches!(err, FaqcatError::CategoryCapacity { capacity: 1, slot: 1 }));
        assert!(!classifier.index().contains("second"));
    }

    #[test]
    fn test_from_documents_sizes_rows() {
        let documents = vec![
            Document::from_tokens(tokens("reset password"), vec!["security".into()]),
            Document::from_tokens(tokens("refund invoice"), vec!["billing".into(), "refunds".into()]),
        ];
        let classifier =
            CategoryClassifier::from_documents(&documents, ClassifierConfig::default()).unwrap();
        assert_eq!(classifier.model().num_categories(), 3);
        assert_eq!(classifier.index().slot_of("refunds").unwrap(), 2);
    }

    #[test]
    fn test_top_categories_order() {
        let mut classifier =
            CategoryClassifier::new(ClassifierConfig::with_dimensions(3, 1024)).unwrap();
        let alpha = tokens("alpha report");
        let beta = tokens("beta summary");
        for _ in 0..20 {
            classifier.train(&alpha, "A").unwrap();
            classifier.train(&beta, "B").unwrap();
        }

        let top = classifier.top_categories(&alpha, 5).unwrap();
        // Slot 2 has no category yet, so only two entries come back.
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].0, "A");
        assert!(top[0].1 > top[1].1);
        assert_eq!(classifier.top_categories(&alpha, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut classifier =
            CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 128)).unwrap();
        classifier.train(&tokens("alpha"), "A").unwrap();
        classifier.train(&tokens("beta"), "B").unwrap();

        let blobs = classifier.to_bytes().unwrap();
        let restored = CategoryClassifier::from_bytes(&blobs).unwrap();

        let query = tokens("alpha beta gamma");
        assert_eq!(restored.classify(&query).unwrap(), classifier.classify(&query).unwrap());
        assert_eq!(restored.index(), classifier.index());
    }

    #[test]
    fn test_bytes_keep_weighting_and_corpus() {
        let documents = vec![
            Document::from_tokens(tokens("reset password login"), vec!["security".into()]),
            Document::from_tokens(tokens("refund invoice password"), vec!["billing".into()]),
        ];
        let mut classifier =
            CategoryClassifier::from_documents(&documents, ClassifierConfig::with_dimensions(2, 256))
                .unwrap()
                .with_weighting(TokenWeighting::TfIdf);
        for _ in 0..10 {
            for document in &documents {
                classifier.train(document.tokens(), &document.categories[0]).unwrap();
            }
        }

        let restored = CategoryClassifier::from_bytes(&classifier.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.weighting(), TokenWeighting::TfIdf);
        assert_eq!(restored.corpus_stats(), classifier.corpus_stats());

        let query = tokens("password refund unknown");
        assert_eq!(restored.encode(&query), classifier.encode(&query));
        assert_eq!(restored.classify(&query).unwrap(), classifier.classify(&query).unwrap());
    }

    #[test]
    fn test_bare_model_blob_is_not_a_classifier() {
        let classifier = CategoryClassifier::new(ClassifierConfig::with_dimensions(2, 64)).unwrap();
        let blobs = ClassifierBlobs {
            model: classifier.model().serialize().unwrap(),
            categories: classifier.index().persist().unwrap(),
        };
        assert!(matches!(
            CategoryClassifier::from_bytes(&blobs),
            Err(FaqcatError::Serialization(_))
        ));
    }
}
