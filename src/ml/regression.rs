//! Online multinomial logistic regression.
//!
//! One weight row per category slot, one column per feature index. Each
//! [`train_step`](OnlineLogisticRegression::train_step) is a single stochastic
//! gradient step on the softmax cross-entropy loss with an annealed learning
//! rate:
//!
//! ```text
//! rate(t)      = learning_rate / (step_offset + t) ^ decay_exponent
//! rate(t, j)   = rate(t) * sqrt(A / (A + n_j))        A = per_term_annealing_offset
//! w[r][j]     += rate(t, j) * (y_r - p_r) * x_j
//! ```
//!
//! Regularization is lazy: a column is only shrunk when a training vector
//! touches it, by the number of steps it missed since it was last shrunk.
//! [`flush_regularization`](OnlineLogisticRegression::flush_regularization)
//! catches every column up.

use serde::{Deserialize, Serialize};

use crate::config::{CategoryGrowth, ClassifierConfig, Regularization};
use crate::error::{FaqcatError, Result};
use crate::ml::features::FeatureVector;
use crate::persistence::{self, BlobKind};

/// The regression model: hyperparameters, weights and schedule state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineLogisticRegression {
    config: ClassifierConfig,
    /// `weights[slot][feature]`
    weights: Vec<Vec<f64>>,
    /// Training steps taken so far.
    step: u64,
    /// Per-feature count of updates, drives per-term annealing.
    update_counts: Vec<u64>,
    /// Per-feature step at which the column was last regularized.
    last_regularized: Vec<u64>,
}

impl OnlineLogisticRegression {
    /// Create a zero-initialised model.
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let num_features = config.num_features;
        Ok(OnlineLogisticRegression {
            weights: vec![vec![0.0; num_features]; config.num_categories],
            step: 0,
            update_counts: vec![0; num_features],
            last_regularized: vec![0; num_features],
            config,
        })
    }

    /// Model with default hyperparameters and the given dimensions.
    pub fn with_dimensions(num_categories: usize, num_features: usize) -> Result<Self> {
        Self::new(ClassifierConfig::with_dimensions(num_categories, num_features))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Number of weight rows currently allocated.
    pub fn num_categories(&self) -> usize {
        self.weights.len()
    }

    pub fn num_features(&self) -> usize {
        self.config.num_features
    }

    /// Training steps taken so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Whether at least one training step has been taken.
    pub fn is_trained(&self) -> bool {
        self.step > 0
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Weight of `feature` in the row of `slot`.
    pub fn weight(&self, slot: usize, feature: usize) -> Option<f64> {
        self.weights.get(slot).and_then(|row| row.get(feature)).copied()
    }

    /// Annealed learning rate for the next step.
    pub fn current_learning_rate(&self) -> f64 {
        let c = &self.config;
        c.learning_rate / (c.step_offset + self.step as f64).powf(c.decay_exponent)
    }

    fn per_term_rate(&self, rate: f64, feature: usize) -> f64 {
        let a = self.config.per_term_annealing_offset;
        rate * (a / (a + self.update_counts[feature] as f64)).sqrt()
    }

    fn check_dimensions(&self, vector: &FeatureVector) -> Result<()> {
        if vector.size() != self.num_features() {
            return Err(FaqcatError::dimension_mismatch(
                self.num_features(),
                vector.size(),
            ));
        }
        Ok(())
    }

    /// Make sure a row exists for `slot`, growing the matrix if allowed.
    fn ensure_row(&mut self, slot: usize) -> Result<()> {
        if slot < self.weights.len() {
            return Ok(());
        }
        match self.config.category_growth {
            CategoryGrowth::Fixed => Err(FaqcatError::CategoryCapacity {
                capacity: self.weights.len(),
                slot,
            }),
            CategoryGrowth::Grow => {
                let num_features = self.num_features();
                self.weights.resize_with(slot + 1, || vec![0.0; num_features]);
                Ok(())
            }
        }
    }

    /// Shrink `weight` by `gap` steps worth of the per-step `penalty`.
    fn shrink(&self, weight: f64, penalty: f64, gap: u64) -> f64 {
        match self.config.regularization {
            Regularization::L2 => weight * (1.0 - penalty.min(1.0)).powf(gap as f64),
            Regularization::L1 => {
                let threshold = penalty * gap as f64;
                if weight.abs() <= threshold {
                    0.0
                } else {
                    weight - threshold.copysign(weight)
                }
            }
        }
    }

    fn regularize_column(&mut self, feature: usize, penalty: f64) {
        let gap = self.step - self.last_regularized[feature];
        if gap > 0 && penalty > 0.0 {
            for r in 0..self.weights.len() {
                let w = self.weights[r][feature];
                self.weights[r][feature] = self.shrink(w, penalty, gap);
            }
        }
        self.last_regularized[feature] = self.step;
    }

    fn penalty(&self, rate: f64) -> f64 {
        self.config.alpha * self.config.lambda * rate
    }

    /// One stochastic gradient step for the one-hot label `slot`.
    pub fn train_step(&mut self, slot: usize, vector: &FeatureVector) -> Result<()> {
        self.check_dimensions(vector)?;
        self.ensure_row(slot)?;

        let rate = self.current_learning_rate();
        let penalty = self.penalty(rate);
        for (feature, _) in vector.iter() {
            self.regularize_column(feature, penalty);
        }

        let probabilities = self.softmax(vector);
        for (feature, value) in vector.iter() {
            let feature_rate = self.per_term_rate(rate, feature);
            for (r, p) in probabilities.iter().enumerate() {
                let target = if r == slot { 1.0 } else { 0.0 };
                self.weights[r][feature] += feature_rate * (target - p) * value;
            }
            self.update_counts[feature] += 1;
        }

        self.step += 1;
        Ok(())
    }

    /// Apply all pending regularization to every column.
    pub fn flush_regularization(&mut self) {
        let penalty = self.penalty(self.current_learning_rate());
        for feature in 0..self.num_features() {
            self.regularize_column(feature, penalty);
        }
    }

    fn softmax(&self, vector: &FeatureVector) -> Vec<f64> {
        let scores: Vec<f64> = self.weights.iter().map(|row| vector.dot(row)).collect();
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }

    /// Probability of every category slot for `vector`.
    pub fn classify(&self, vector: &FeatureVector) -> Result<Vec<f64>> {
        self.check_dimensions(vector)?;
        Ok(self.softmax(vector))
    }

    /// Most probable slot; ties go to the lowest slot.
    pub fn predict_category(&self, vector: &FeatureVector) -> Result<usize> {
        let probabilities = self.classify(vector)?;
        Ok(argmax(&probabilities))
    }

    /// Probability of `slot`, or 0.0 for a slot the model has no row for.
    pub fn probability_of(&self, vector: &FeatureVector, slot: usize) -> Result<f64> {
        let probabilities = self.classify(vector)?;
        Ok(probabilities.get(slot).copied().unwrap_or(0.0))
    }

    /// Zero all weights and restart the learning-rate schedule.
    pub fn reset(&mut self) {
        for row in &mut self.weights {
            row.iter_mut().for_each(|w| *w = 0.0);
        }
        self.step = 0;
        self.update_counts.iter_mut().for_each(|n| *n = 0);
        self.last_regularized.iter_mut().for_each(|n| *n = 0);
    }

    /// Encode the full model state into a framed blob.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        persistence::encode_serde(BlobKind::Model, self)
    }

    /// Restore a model written by [`serialize`](Self::serialize).
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let model: OnlineLogisticRegression = persistence::decode_serde(BlobKind::Model, bytes)?;
        model.validate_state()?;
        Ok(model)
    }

    pub(crate) fn validate_state(&self) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| FaqcatError::serialization(format!("Invalid persisted model: {e}")))?;
        let num_features = self.num_features();
        let consistent = self.weights.iter().all(|row| row.len() == num_features)
            && self.update_counts.len() == num_features
            && self.last_regularized.len() == num_features
            && self.last_regularized.iter().all(|&s| s <= self.step);
        if !consistent {
            return Err(FaqcatError::serialization(
                "Persisted model has inconsistent dimensions",
            ));
        }
        Ok(())
    }
}

/// Index of the largest value, first one on ties. Empty input yields 0.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Slots ordered by descending probability; equal probabilities keep slot order.
pub fn rank_by_probability(probabilities: &[f64]) -> Vec<usize> {
    let mut slots: Vec<usize> = (0..probabilities.len()).collect();
    slots.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    slots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(size: usize, entries: &[(usize, f64)]) -> FeatureVector {
        FeatureVector::from_entries(size, entries.iter().copied()).unwrap()
    }

    #[test]
    fn test_untrained_is_uniform() {
        let model = OnlineLogisticRegression::with_dimensions(4, 8).unwrap();
        let probabilities = model.classify(&vector(8, &[(0, 1.0), (3, 2.0)])).unwrap();
        assert!(probabilities.iter().all(|p| (p - 0.25).abs() < 1e-12));
        assert_eq!(model.predict_category(&vector(8, &[(0, 1.0)])).unwrap(), 0);
        assert!(!model.is_trained());
    }

    #[test]
    fn test_single_step_matches_hand_computation() {
        let mut model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        let x = vector(4, &[(0, 1.0), (2, 2.0)]);
        model.train_step(1, &x).unwrap();

        // rate = 50 / 10000, p = (0.5, 0.5), counts start at 0 so no per-term damping
        let rate = 50.0 / 10_000.0;
        assert!((model.weight(1, 0).unwrap() - rate * 0.5).abs() < 1e-15);
        assert!((model.weight(1, 2).unwrap() - rate * 0.5 * 2.0).abs() < 1e-15);
        assert!((model.weight(0, 2).unwrap() + rate * 0.5 * 2.0).abs() < 1e-15);
        assert_eq!(model.weight(1, 1).unwrap(), 0.0);
        assert_eq!(model.step(), 1);
    }

    #[test]
    fn test_learns_separable_classes() {
        let mut model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        let a = vector(4, &[(0, 1.0), (1, 2.0)]);
        let b = vector(4, &[(0, 1.0), (2, 2.0)]);
        for _ in 0..30 {
            model.train_step(0, &a).unwrap();
            model.train_step(1, &b).unwrap();
        }
        assert_eq!(model.predict_category(&a).unwrap(), 0);
        assert_eq!(model.predict_category(&b).unwrap(), 1);
        assert!(model.probability_of(&a, 0).unwrap() > 0.5);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        let wrong = vector(5, &[(0, 1.0)]);
        assert!(matches!(
            model.classify(&wrong),
            Err(FaqcatError::DimensionMismatch { expected: 4, actual: 5 })
        ));
        assert!(model.train_step(0, &wrong).is_err());
        assert_eq!(model.step(), 0);
    }

    #[test]
    fn test_unknown_slot_probability_is_zero() {
        let model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        let x = vector(4, &[(0, 1.0)]);
        assert_eq!(model.probability_of(&x, 7).unwrap(), 0.0);
    }

    #[test]
    fn test_fixed_capacity() {
        let mut model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        let x = vector(4, &[(0, 1.0)]);
        assert!(matches!(
            model.train_step(2, &x),
            Err(FaqcatError::CategoryCapacity { capacity: 2, slot: 2 })
        ));
    }

    #[test]
    fn test_growing_rows() {
        let config = ClassifierConfig {
            num_categories: 1,
            num_features: 4,
            category_growth: CategoryGrowth::Grow,
            ..Default::default()
        };
        let mut model = OnlineLogisticRegression::new(config).unwrap();
        let x = vector(4, &[(0, 1.0), (1, 1.0)]);
        model.train_step(2, &x).unwrap();

        assert_eq!(model.num_categories(), 3);
        assert_eq!(model.classify(&x).unwrap().len(), 3);
        assert_eq!(model.predict_category(&x).unwrap(), 2);
    }

    #[test]
    fn test_l1_produces_exact_zeros() {
        let config = ClassifierConfig {
            num_categories: 2,
            num_features: 4,
            lambda: 1.0,
            regularization: Regularization::L1,
            ..Default::default()
        };
        let mut model = OnlineLogisticRegression::new(config).unwrap();
        model.train_step(0, &vector(4, &[(1, 1.0)])).unwrap();
        for _ in 0..10 {
            model.train_step(0, &vector(4, &[(2, 1.0)])).unwrap();
        }
        assert_ne!(model.weight(0, 1).unwrap(), 0.0);

        // rate * lambda per step exceeds the single update feature 1 received
        model.flush_regularization();
        assert_eq!(model.weight(0, 1).unwrap(), 0.0);
        assert_eq!(model.weight(1, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_l2_shrinks_without_zeroing() {
        let config = ClassifierConfig {
            num_categories: 2,
            num_features: 4,
            lambda: 1.0,
            ..Default::default()
        };
        let mut model = OnlineLogisticRegression::new(config).unwrap();
        model.train_step(0, &vector(4, &[(1, 1.0)])).unwrap();
        let before = model.weight(0, 1).unwrap();
        for _ in 0..10 {
            model.train_step(0, &vector(4, &[(2, 1.0)])).unwrap();
        }
        model.flush_regularization();
        let after = model.weight(0, 1).unwrap();
        assert!(after > 0.0 && after < before);
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut model = OnlineLogisticRegression::with_dimensions(3, 8).unwrap();
        let x = vector(8, &[(0, 1.0), (5, 2.0)]);
        model.train_step(2, &x).unwrap();
        model.train_step(1, &vector(8, &[(0, 1.0), (3, 2.0)])).unwrap();

        let bytes = model.serialize().unwrap();
        let restored = OnlineLogisticRegression::deserialize(&bytes).unwrap();

        assert_eq!(restored, model);
        assert_eq!(restored.classify(&x).unwrap(), model.classify(&x).unwrap());
    }

    #[test]
    fn test_reset() {
        let mut model = OnlineLogisticRegression::with_dimensions(2, 4).unwrap();
        model.train_step(1, &vector(4, &[(0, 1.0)])).unwrap();
        model.reset();
        assert_eq!(model, OnlineLogisticRegression::with_dimensions(2, 4).unwrap());
    }

    #[test]
    fn test_argmax_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_rank_is_stable() {
        assert_eq!(rank_by_probability(&[0.1, 0.3, 0.3, 0.3]), vec![1, 2, 3, 0]);
        assert!(rank_by_probability(&[]).is_empty());
    }
}
