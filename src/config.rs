//! Configuration for classifiers, training runs and evaluations.
//!
//! Every section has a `Default` matching the tuned values used for FAQ
//! categorization and a `validate()` that rejects values the numerical code
//! cannot work with. [`FaqcatConfig`] bundles the sections and round-trips
//! through JSON.
//!
//! # Examples
//!
//! ```
//! use faqcat::config::{ClassifierConfig, Regularization};
//!
//! let config = ClassifierConfig {
//!     num_categories: 2,
//!     num_features: 7,
//!     regularization: Regularization::L1,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::TokenizerOption;
use crate::error::{FaqcatError, Result};
use crate::ml::features::TokenWeighting;

/// Penalty used to shrink weights toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularization {
    /// Soft-threshold shrinkage; small weights become exactly zero.
    L1,
    /// Proportional shrinkage.
    #[default]
    L2,
}

/// What happens when training reaches a category slot the weight matrix has
/// no row for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGrowth {
    /// The row count is fixed at construction; out-of-range slots are errors.
    #[default]
    Fixed,
    /// Zero-initialised rows are appended up to the new slot.
    Grow,
}

/// Hyperparameters of the online logistic-regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of weight rows (category slots) allocated up front.
    pub num_categories: usize,
    /// Size of the hashed feature space, including the intercept at slot 0.
    pub num_features: usize,
    pub learning_rate: f64,
    /// Mixing weight of the regularization penalty, in `[0, 1]`.
    pub alpha: f64,
    /// Regularization strength.
    pub lambda: f64,
    pub step_offset: f64,
    pub decay_exponent: f64,
    /// Offset of the per-feature annealing schedule.
    pub per_term_annealing_offset: f64,
    pub regularization: Regularization,
    pub category_growth: CategoryGrowth,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            num_categories: 100,
            num_features: 10_000,
            learning_rate: 50.0,
            alpha: 1.0,
            lambda: 1e-6,
            step_offset: 10_000.0,
            decay_exponent: 1.0,
            per_term_annealing_offset: 20.0,
            regularization: Regularization::L2,
            category_growth: CategoryGrowth::Fixed,
        }
    }
}

impl ClassifierConfig {
    /// Convenience constructor for the two dimensions that vary per corpus.
    pub fn with_dimensions(num_categories: usize, num_features: usize) -> Self {
        ClassifierConfig {
            num_categories,
            num_features,
            ..Default::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_features < 2 {
            return Err(FaqcatError::invalid_config(format!(
                "num_features must be at least 2 (slot 0 is the intercept), got {}",
                self.num_features
            )));
        }
        if self.num_categories == 0 {
            return Err(FaqcatError::invalid_config(
                "num_categories must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(FaqcatError::invalid_config(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(self.learning_rate > 0.0) {
            return Err(FaqcatError::invalid_config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.lambda >= 0.0) {
            return Err(FaqcatError::invalid_config(format!(
                "lambda must be non-negative, got {}",
                self.lambda
            )));
        }
        if !(self.step_offset >= 0.0) {
            return Err(FaqcatError::invalid_config(format!(
                "step_offset must be non-negative, got {}",
                self.step_offset
            )));
        }
        if !(self.decay_exponent >= 0.0) {
            return Err(FaqcatError::invalid_config(format!(
                "decay_exponent must be non-negative, got {}",
                self.decay_exponent
            )));
        }
        if !(self.per_term_annealing_offset > 0.0) {
            return Err(FaqcatError::invalid_config(format!(
                "per_term_annealing_offset must be positive, got {}",
                self.per_term_annealing_offset
            )));
        }
        Ok(())
    }
}

/// Settings of the multi-epoch training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub epochs: usize,
    /// Seed of the per-epoch shuffle; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            epochs: 30,
            seed: None,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(FaqcatError::invalid_config("epochs must be at least 1"));
        }
        Ok(())
    }
}

/// Settings of the repeated train/test evaluation harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub trials: usize,
    /// Share of the corpus used for training in each trial.
    pub train_fraction: f64,
    pub seed: Option<u64>,
    /// Run trials on the rayon thread pool.
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            trials: 50,
            train_fraction: 0.8,
            seed: None,
            parallel: false,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(FaqcatError::invalid_config("trials must be at least 1"));
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(FaqcatError::invalid_config(format!(
                "train_fraction must be in (0, 1), got {}",
                self.train_fraction
            )));
        }
        Ok(())
    }
}

/// Settings of the feature encoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub weighting: TokenWeighting,
}

/// Settings of the tokenizer collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub tokenizer: TokenizerOption,
}

/// Complete faqcat configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqcatConfig {
    pub classifier: ClassifierConfig,
    pub trainer: TrainerConfig,
    pub evaluation: EvaluationConfig,
    pub features: FeatureConfig,
    pub analysis: AnalysisConfig,
}

impl FaqcatConfig {
    /// Read a JSON configuration file. Missing sections and fields take their
    /// defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: FaqcatConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.trainer.validate()?;
        self.evaluation.validate()?;
        self.features.weighting.validate()?;
        Ok(())
    }
}
