//! Repeated train/test-split evaluation.
//!
//! Each trial shuffles the corpus, trains a fresh classifier on the first
//! `train_fraction` of it and scores the rest with three metrics:
//!
//! - top-1 accuracy: a test document counts as correct when the most probable
//!   category is any of its labels; trials are collected into a histogram of
//!   correct counts,
//! - confidence calibration: every `(probability, is_label)` pair lands in one
//!   of 101 integer-percentage buckets,
//! - mean average precision over the probability-ranked category list.
//!
//! Trials are independent, each with its own category index, classifier and
//! RNG seeded from the base seed and the trial number, so sequential and
//! parallel runs produce identical reports.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::Analyzer;
use crate::category::CategoryIndex;
use crate::config::{ClassifierConfig, EvaluationConfig, FaqcatConfig, TrainerConfig};
use crate::document::Document;
use crate::error::{FaqcatError, Result};
use crate::ml::classifier::CategoryClassifier;
use crate::ml::features::{CorpusStats, TokenWeighting};
use crate::ml::regression::{argmax, rank_by_probability};
use crate::ml::trainer::Trainer;

/// Number of calibration buckets, one per integer percentage 0..=100.
pub const CALIBRATION_BUCKETS: usize = 101;

/// Average precision of `ranking` against the `relevant` slots.
///
/// Precision is taken at every rank holding a relevant slot, summed, and
/// divided by the number of relevant slots. The walk stops once all of them
/// have been found. No relevant slots yields 0.0.
pub fn average_precision(ranking: &[usize], relevant: &[usize]) -> f64 {
    let relevant: HashSet<usize> = relevant.iter().copied().collect();
    if relevant.is_empty() {
        return 0.0;
    }

    let mut hits = 0usize;
    let mut precision_sum = 0.0;
    for (rank, slot) in ranking.iter().enumerate() {
        if relevant.contains(slot) {
            hits += 1;
            precision_sum += hits as f64 / (rank + 1) as f64;
            if hits == relevant.len() {
                break;
            }
        }
    }
    precision_sum / relevant.len() as f64
}

/// Successes and observations falling into one confidence bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub successes: usize,
    pub total: usize,
}

impl CalibrationBucket {
    /// `successes / total`, or `None` for an empty bucket.
    pub fn precision(&self) -> Option<f64> {
        (self.total > 0).then(|| self.successes as f64 / self.total as f64)
    }
}

/// Confidence-calibration curve over 101 percentage buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationCurve {
    buckets: Vec<CalibrationBucket>,
}

impl Default for CalibrationCurve {
    fn default() -> Self {
        CalibrationCurve {
            buckets: vec![CalibrationBucket::default(); CALIBRATION_BUCKETS],
        }
    }
}

impl CalibrationCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket index of a probability: `round(probability * 100)`.
    pub fn bucket_of(probability: f64) -> usize {
        ((probability * 100.0).round().max(0.0) as usize).min(CALIBRATION_BUCKETS - 1)
    }

    pub fn record(&mut self, probability: f64, correct: bool) {
        let bucket = &mut self.buckets[Self::bucket_of(probability)];
        bucket.total += 1;
        if correct {
            bucket.successes += 1;
        }
    }

    pub fn merge(&mut self, other: &CalibrationCurve) {
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            mine.successes += theirs.successes;
            mine.total += theirs.total;
        }
    }

    pub fn buckets(&self) -> &[CalibrationBucket] {
        &self.buckets
    }

    /// Observations across all buckets.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.total).sum()
    }

    /// `bucket,precision_percent` lines; empty buckets leave the precision blank.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("bucket,precision_percent\n");
        for (i, bucket) in self.buckets.iter().enumerate() {
            match bucket.precision() {
                Some(p) => {
                    let _ = writeln!(csv, "{i},{}", p * 100.0);
                }
                None => {
                    let _ = writeln!(csv, "{i},");
                }
            }
        }
        csv
    }
}

/// Histogram of per-trial correct counts; index `k` counts the trials with
/// exactly `k` correct test documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccuracyHistogram {
    counts: Vec<usize>,
}

impl AccuracyHistogram {
    pub fn new(test_size: usize) -> Self {
        AccuracyHistogram {
            counts: vec![0; test_size + 1],
        }
    }

    pub fn record(&mut self, correct: usize) {
        if correct >= self.counts.len() {
            self.counts.resize(correct + 1, 0);
        }
        self.counts[correct] += 1;
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn trials(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Trials in which every test document was classified correctly.
    pub fn perfect_trials(&self) -> usize {
        self.counts.last().copied().unwrap_or(0)
    }

    /// Mean share of correct test documents per trial.
    pub fn mean_accuracy(&self) -> f64 {
        let trials = self.trials();
        let test_size = self.counts.len().saturating_sub(1);
        if trials == 0 || test_size == 0 {
            return 0.0;
        }
        let correct: usize = self.counts.iter().enumerate().map(|(k, n)| k * n).sum();
        correct as f64 / (trials * test_size) as f64
    }

    /// `correct[k]=n` for every non-empty count, one per line.
    pub fn summary(&self) -> String {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, n)| **n > 0)
            .map(|(k, n)| format!("correct[{k}]={n}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Scores of a single train/test trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub trial: usize,
    /// Test documents whose top category is one of their labels.
    pub correct: usize,
    pub calibration: CalibrationCurve,
    /// Average precision per labeled test document.
    pub average_precisions: Vec<f64>,
}

/// Aggregated results of an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub trials: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub categories: usize,
    pub accuracy_histogram: AccuracyHistogram,
    pub mean_accuracy: f64,
    pub calibration: CalibrationCurve,
    pub mean_average_precision: f64,
    pub generated_at: DateTime<Utc>,
}

/// Runs repeated train/test trials over a labeled corpus.
#[derive(Clone)]
pub struct Evaluator {
    config: EvaluationConfig,
    classifier: ClassifierConfig,
    trainer: TrainerConfig,
    weighting: TokenWeighting,
    analyzer: Option<Arc<dyn Analyzer>>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .field("trainer", &self.trainer)
            .field("weighting", &self.weighting)
            .field("analyzer", &self.analyzer.as_ref().map(|a| a.name()))
            .finish()
    }
}

impl Evaluator {
    pub fn new(
        config: EvaluationConfig,
        classifier: ClassifierConfig,
        trainer: TrainerConfig,
    ) -> Result<Self> {
        config.validate()?;
        classifier.validate()?;
        trainer.validate()?;
        Ok(Evaluator {
            config,
            classifier,
            trainer,
            weighting: TokenWeighting::default(),
            analyzer: None,
        })
    }

    /// Evaluator for every section of a complete configuration, tokenizing
    /// with the configured analyzer.
    pub fn from_config(config: &FaqcatConfig) -> Result<Self> {
        let analyzer: Arc<dyn Analyzer> = Arc::new(config.analysis.tokenizer.analyzer()?);
        Ok(Self::new(
            config.evaluation.clone(),
            config.classifier.clone(),
            config.trainer.clone(),
        )?
        .with_weighting(config.features.weighting)
        .with_analyzer(analyzer))
    }

    pub fn with_weighting(mut self, weighting: TokenWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    /// Tokenize documents that carry text but no cached tokens.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Split sizes for a corpus of `n` documents. Both sides get at least one.
    pub fn split_sizes(&self, n: usize) -> Result<(usize, usize)> {
        if n < 2 {
            return Err(FaqcatError::invalid_argument(format!(
                "Evaluation needs at least 2 documents, got {n}"
            )));
        }
        let train = ((n as f64 * self.config.train_fraction).round() as usize).clamp(1, n - 1);
        Ok((train, n - train))
    }

    fn trial_seed(base: u64, trial: usize) -> u64 {
        // splitmix64 step so neighbouring trials get unrelated streams
        let mut z = base.wrapping_add((trial as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15));
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn prepare(&self, documents: &[Document]) -> Result<Vec<Document>> {
        let mut prepared = documents.to_vec();
        if let Some(analyzer) = &self.analyzer {
            for document in prepared.iter_mut() {
                document.tokenize_with(analyzer.as_ref())?;
            }
        }
        Ok(prepared)
    }

    /// Run every trial and aggregate the metrics.
    pub fn evaluate(&self, documents: &[Document]) -> Result<EvaluationReport> {
        let documents = self.prepare(documents)?;
        let (train_size, test_size) = self.split_sizes(documents.len())?;
        let index = CategoryIndex::from_documents(&documents);
        let base_seed = self
            .config
            .seed
            .unwrap_or_else(|| rand::rng().random::<u64>());

        info!(
            "Evaluating {} trials: {} training / {} test documents, {} categories",
            self.config.trials,
            train_size,
            test_size,
            index.size()
        );

        let run = |trial: usize| {
            self.run_trial(&documents, &index, Self::trial_seed(base_seed, trial), trial)
        };
        let results: Vec<TrialResult> = if self.config.parallel {
            (0..self.config.trials)
                .into_par_iter()
                .map(run)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..self.config.trials).map(run).collect::<Result<Vec<_>>>()?
        };

        let mut histogram = AccuracyHistogram::new(test_size);
        let mut calibration = CalibrationCurve::new();
        let mut precision_sum = 0.0;
        let mut precision_count = 0usize;
        for result in &results {
            histogram.record(result.correct);
            calibration.merge(&result.calibration);
            precision_sum += result.average_precisions.iter().sum::<f64>();
            precision_count += result.average_precisions.len();
        }

        let mean_average_precision = if precision_count == 0 {
            0.0
        } else {
            precision_sum / precision_count as f64
        };

        let report = EvaluationReport {
            trials: results.len(),
            train_size,
            test_size,
            categories: index.size(),
            mean_accuracy: histogram.mean_accuracy(),
            accuracy_histogram: histogram,
            calibration,
            mean_average_precision,
            generated_at: Utc::now(),
        };

        info!(
            "Mean accuracy {:.4}, MAP {:.4} over {} trials",
            report.mean_accuracy, report.mean_average_precision, report.trials
        );
        Ok(report)
    }

    /// One train/test trial over tokenized `documents`, with slots taken from
    /// `index`.
    pub fn run_trial(
        &self,
        documents: &[Document],
        index: &CategoryIndex,
        seed: u64,
        trial: usize,
    ) -> Result<TrialResult> {
        let (train_size, _) = self.split_sizes(documents.len())?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..documents.len()).collect();
        order.shuffle(&mut rng);

        let (train_ids, test_ids) = order.split_at(train_size);
        let training: Vec<Document> = train_ids.iter().map(|&i| documents[i].clone()).collect();

        let config = ClassifierConfig {
            num_categories: index.size().max(1),
            ..self.classifier.clone()
        };
        let mut classifier = CategoryClassifier::with_index(index.clone(), config)?
            .with_weighting(self.weighting)
            .with_corpus_stats(CorpusStats::from_documents(&training));

        let mut trainer = Trainer::new(TrainerConfig {
            epochs: self.trainer.epochs,
            seed: Some(rng.random()),
        })?;
        trainer.fit(&mut classifier, &training)?;

        let mut correct = 0;
        let mut calibration = CalibrationCurve::new();
        let mut average_precisions = Vec::with_capacity(test_ids.len());

        for &i in test_ids {
            let document = &documents[i];
            let probabilities = classifier.classify(document.tokens())?;
            let relevant: Vec<usize> = document
                .categories
                .iter()
                .filter_map(|id| index.get_slot(id))
                .collect();

            if relevant.contains(&argmax(&probabilities)) {
                correct += 1;
            }
            for (slot, &p) in probabilities.iter().enumerate() {
                calibration.record(p, relevant.contains(&slot));
            }
            if !relevant.is_empty() {
                let ranking = rank_by_probability(&probabilities);
                average_precisions.push(average_precision(&ranking, &relevant));
            }
        }

        debug!(
            "Trial {}: {}/{} correct",
            trial + 1,
            correct,
            test_ids.len()
        );

        Ok(TrialResult {
            trial,
            correct,
            calibration,
            average_precisions,
        })
    }
}
