//! Learning components of faqcat.
//!
//! Feature hashing, the online multinomial logistic regression, the
//! category-level classifier built on them, the training loop and the
//! evaluation harness.

pub mod classifier;
pub mod evaluation;
pub mod features;
pub mod regression;
pub mod trainer;

pub use classifier::{CategoryClassifier, ClassifierBlobs};
pub use evaluation::{
    AccuracyHistogram, CalibrationBucket, CalibrationCurve, EvaluationReport, Evaluator,
    TrialResult, average_precision,
};
pub use features::{CorpusStats, FeatureEncoder, FeatureVector, TokenWeighting, WeightFn};
pub use regression::{OnlineLogisticRegression, argmax, rank_by_probability};
pub use trainer::{Trainer, TrainingSummary};
