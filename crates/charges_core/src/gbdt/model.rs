//! GBDT ensemble with deterministic integer inference

use super::tree::Tree;
use crate::errors::{ChargesError, Result};
use serde::{Deserialize, Serialize};

/// Fixed-point scale factor (1e6, micro units)
pub const SCALE: i64 = 1_000_000;

/// Current ensemble format version
const MODEL_VERSION: i32 = 1;

/// Convert a real value to fixed-point, rounding to the nearest micro unit.
///
/// Out-of-range and NaN inputs saturate (NaN maps to 0).
pub fn to_fixed(value: f64) -> i64 {
    (value * SCALE as f64).round() as i64
}

/// Convert a fixed-point value back to a real number
pub fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Boosted regression ensemble
///
/// Score = `bias + Σ leaf(tree) * tree.weight / scale`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale factor
    pub scale: i64,

    /// Width of the feature vector the trees were fitted on
    pub feature_count: usize,

    /// Initial prediction (training target mean)
    pub bias: i64,

    /// Decision trees in the ensemble
    pub trees: Vec<Tree>,
}

impl Model {
    pub fn new(feature_count: usize, trees: Vec<Tree>, bias: i64) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            bias,
            trees,
        }
    }

    /// Structural check run on every loaded artifact
    pub fn validate(&self) -> Result<()> {
        if self.version != MODEL_VERSION {
            return Err(ChargesError::ValidationFailed(format!(
                "unsupported ensemble version {}",
                self.version
            )));
        }

        if self.scale != SCALE {
            return Err(ChargesError::ValidationFailed(format!(
                "ensemble scale {} does not match {SCALE}",
                self.scale
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_count)
                .map_err(|e| ChargesError::ValidationFailed(format!("tree {i}: {e}")))?;
        }

        Ok(())
    }

    /// Deterministic fixed-point score for one feature vector
    pub fn score(&self, features: &[i64]) -> i64 {
        let mut sum = self.bias as i128;

        for tree in &self.trees {
            let leaf_value = tree.evaluate(features) as i128;
            sum += leaf_value * tree.weight as i128 / self.scale as i128;
        }

        sum.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Score after checking the feature width
    pub fn try_score(&self, features: &[i64]) -> Result<i64> {
        if features.len() != self.feature_count {
            return Err(ChargesError::FeatureWidth {
                expected: self.feature_count,
                got: features.len(),
            });
        }
        Ok(self.score(features))
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}
