//! Regression quality metrics for training reports

use crate::errors::{ChargesError, Result};
use serde::{Deserialize, Serialize};

/// Goodness-of-fit summary over one data subset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub samples: usize,
}

impl RegressionMetrics {
    /// Compare predictions against observed targets.
    ///
    /// R² of a constant target is reported as 0.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(ChargesError::InvalidInput(format!(
                "{} targets but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }
        if actual.is_empty() {
            return Err(ChargesError::InvalidInput(
                "cannot score an empty subset".to_string(),
            ));
        }

        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;

        let mut sse = 0.0;
        let mut sst = 0.0;
        let mut abs = 0.0;
        for (&y, &p) in actual.iter().zip(predicted) {
            let err = y - p;
            sse += err * err;
            abs += err.abs();
            sst += (y - mean) * (y - mean);
        }

        let r2 = if sst > 0.0 { 1.0 - sse / sst } else { 0.0 };

        Ok(Self {
            r2,
            rmse: (sse / n).sqrt(),
            mae: abs / n,
            samples: actual.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit() {
        let y = [1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.samples, 3);
    }

    #[test]
    fn known_errors() {
        let m = RegressionMetrics::compute(&[0.0, 4.0], &[1.0, 1.0]).unwrap();
        // errors -1 and 3
        assert_eq!(m.mae, 2.0);
        assert_eq!(m.rmse, 5.0_f64.sqrt());
        // sst = 8, sse = 10
        assert!((m.r2 - (1.0 - 10.0 / 8.0)).abs() < 1e-12);
    }

    #[test]
    fn constant_target_has_zero_r2() {
        let m = RegressionMetrics::compute(&[2.0, 2.0], &[1.0, 3.0]).unwrap();
        assert_eq!(m.r2, 0.0);
    }

    #[test]
    fn rejects_mismatched_or_empty() {
        assert!(RegressionMetrics::compute(&[1.0], &[]).is_err());
        assert!(RegressionMetrics::compute(&[], &[]).is_err());
    }
}
