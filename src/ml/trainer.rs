//! Multi-epoch shuffled training loop.
//!
//! Every epoch visits the trainable documents in a fresh random order and
//! takes one gradient step per (document, label) pair. Categories first seen
//! during training are registered on the fly. Documents without text, tokens
//! or labels are skipped.

use std::borrow::Cow;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::config::TrainerConfig;
use crate::document::Document;
use crate::error::Result;
use crate::ml::classifier::CategoryClassifier;

/// Counters collected by one [`Trainer::fit`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    /// Documents that took part in training.
    pub documents_used: usize,
    /// Documents skipped for lack of text, tokens or labels.
    pub documents_skipped: usize,
    /// Gradient steps taken.
    pub steps: u64,
    /// Categories registered after training.
    pub categories: usize,
}

/// Drives a [`CategoryClassifier`] over a labeled corpus.
pub struct Trainer {
    config: TrainerConfig,
    rng: StdRng,
    analyzer: Option<Arc<dyn Analyzer>>,
}

impl std::fmt::Debug for Trainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trainer")
            .field("config", &self.config)
            .field("analyzer", &self.analyzer.as_ref().map(|a| a.name()))
            .finish()
    }
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Trainer {
            config,
            rng,
            analyzer: None,
        })
    }

    /// Trainer with default settings and a fixed shuffle seed.
    pub fn seeded(epochs: usize, seed: u64) -> Result<Self> {
        Self::new(TrainerConfig {
            epochs,
            seed: Some(seed),
        })
    }

    /// Tokenize documents that carry text but no cached tokens.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn tokens_of<'a>(&self, document: &'a Document) -> Result<Cow<'a, [String]>> {
        match (&document.tokens, &self.analyzer, document.text.as_deref()) {
            (Some(tokens), _, _) => Ok(Cow::Borrowed(tokens.as_slice())),
            (None, Some(analyzer), Some(text)) => {
                Ok(Cow::Owned(analyzer.analyze_to_strings(text)?))
            }
            _ => Ok(Cow::Borrowed(&[])),
        }
    }

    /// Train for the configured number of epochs.
    pub fn fit(
        &mut self,
        classifier: &mut CategoryClassifier,
        documents: &[Document],
    ) -> Result<TrainingSummary> {
        let epochs = self.config.epochs;
        self.fit_epochs(classifier, documents, epochs)
    }

    /// Train for `epochs` epochs. Training continues from the classifier's
    /// current state.
    pub fn fit_epochs(
        &mut self,
        classifier: &mut CategoryClassifier,
        documents: &[Document],
        epochs: usize,
    ) -> Result<TrainingSummary> {
        let tokens = documents
            .iter()
            .map(|doc| self.tokens_of(doc))
            .collect::<Result<Vec<_>>>()?;

        let mut order: Vec<usize> = (0..documents.len())
            .filter(|&i| {
                documents[i].has_text() && documents[i].has_labels() && !tokens[i].is_empty()
            })
            .collect();

        let mut summary = TrainingSummary {
            epochs,
            documents_used: order.len(),
            documents_skipped: documents.len() - order.len(),
            ..Default::default()
        };
        if summary.documents_skipped > 0 {
            warn!(
                "Skipping {} of {} documents without text, tokens or labels",
                summary.documents_skipped,
                documents.len()
            );
        }

        for epoch in 0..epochs {
            order.shuffle(&mut self.rng);
            let steps_before = summary.steps;

            for &i in &order {
                let vector = classifier.encode(&tokens[i]);
                for category in &documents[i].categories {
                    classifier.train_vector(&vector, category)?;
                    summary.steps += 1;
                }
            }

            debug!(
                "Epoch {}/{}: {} steps, learning rate {:.3e}",
                epoch + 1,
                epochs,
                summary.steps - steps_before,
                classifier.model().current_learning_rate()
            );
        }

        classifier.model_mut().flush_regularization();
        summary.categories = classifier.index().size();

        info!(
            "Trained {} steps over {} documents ({} epochs, {} categories)",
            summary.steps, summary.documents_used, epochs, summary.categories
        );
        Ok(summary)
    }
}
