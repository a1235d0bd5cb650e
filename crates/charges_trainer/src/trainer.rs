//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Squared-error boosting with fixed-point arithmetic: the ensemble starts at
//! the target mean and each round fits a CART tree to the current residuals.

use charges_core::{Model, SCALE};
use std::collections::BTreeMap;

use crate::cart::{CartBuilder, TreeConfig};
use crate::errors::TrainerError;

/// GBDT training configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GbdtConfig {
    pub num_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub learning_rate: i64, // Fixed-point, e.g., 100_000 = 0.1
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            learning_rate: 100_000, // 0.1 in fixed-point
        }
    }
}

impl GbdtConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.num_trees == 0 {
            return Err(TrainerError::Training("num_trees must be at least 1".into()));
        }
        if self.max_depth == 0 {
            return Err(TrainerError::Training("max_depth must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(TrainerError::Training(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::Training(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.learning_rate <= 0 || self.learning_rate > SCALE {
            return Err(TrainerError::Training(format!(
                "learning_rate must be in (0, {SCALE}]"
            )));
        }
        Ok(())
    }

    /// Parameters as recorded in artifact metadata
    pub fn as_parameters(&self) -> BTreeMap<String, i64> {
        BTreeMap::from([
            ("num_trees".to_string(), self.num_trees as i64),
            ("max_depth".to_string(), self.max_depth as i64),
            ("min_samples_split".to_string(), self.min_samples_split as i64),
            ("min_samples_leaf".to_string(), self.min_samples_leaf as i64),
            ("learning_rate".to_string(), self.learning_rate),
        ])
    }
}

/// Trained ensemble plus normalized split-gain importance per feature
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: Model,
    pub feature_importance: Vec<f64>,
}

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    /// Fit the ensemble on fixed-point feature rows and targets
    pub fn train(
        &self,
        features: &[Vec<i64>],
        targets: &[i64],
    ) -> Result<TrainedModel, TrainerError> {
        self.config.validate()?;

        if features.is_empty() {
            return Err(TrainerError::Training("no training samples".into()));
        }
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        let feature_count = features[0].len();
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(TrainerError::Training("ragged feature rows".into()));
        }

        let bias = self.calculate_bias(targets);
        let mut predictions = vec![bias; targets.len()];
        let mut trees = Vec::with_capacity(self.config.num_trees);
        let mut total_gains = vec![0i128; feature_count];

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
        };

        for tree_idx in 0..self.config.num_trees {
            let gradients = self.calculate_gradients(targets, &predictions);

            let fitted = CartBuilder::new(features, &gradients, tree_config.clone())
                .build(self.config.learning_rate);

            self.update_predictions(&fitted.tree, features, &mut predictions);

            for (total, gain) in total_gains.iter_mut().zip(&fitted.feature_gains) {
                *total += gain;
            }

            tracing::debug!(
                tree = tree_idx + 1,
                nodes = fitted.tree.nodes.len(),
                "tree fitted"
            );
            trees.push(fitted.tree);
        }

        Ok(TrainedModel {
            model: Model::new(feature_count, trees, bias),
            feature_importance: normalize(&total_gains),
        })
    }

    /// Initial prediction: mean of targets
    fn calculate_bias(&self, targets: &[i64]) -> i64 {
        if targets.is_empty() {
            return 0;
        }

        let sum: i128 = targets.iter().map(|&t| t as i128).sum();
        (sum / targets.len() as i128) as i64
    }

    /// Squared-error gradient `prediction - target`; hessians are implicit 1
    fn calculate_gradients(&self, targets: &[i64], predictions: &[i64]) -> Vec<i64> {
        predictions
            .iter()
            .zip(targets)
            .map(|(&p, &t)| p.saturating_sub(t))
            .collect()
    }

    /// Add the shrunken tree output, using the same rounding as `Model::score`
    fn update_predictions(
        &self,
        tree: &charges_core::Tree,
        features: &[Vec<i64>],
        predictions: &mut [i64],
    ) {
        for (pred, row) in predictions.iter_mut().zip(features) {
            let leaf = tree.evaluate(row) as i128;
            let step = leaf * tree.weight as i128 / SCALE as i128;
            *pred = (*pred as i128 + step).clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        }
    }
}

fn normalize(gains: &[i128]) -> Vec<f64> {
    let total: i128 = gains.iter().sum();
    if total <= 0 {
        return vec![0.0; gains.len()];
    }
    gains.iter().map(|&g| g as f64 / total as f64).collect()
}
