//! Two-stage prediction pipeline: one-hot encoder followed by the GBDT.

use crate::encoding::OneHotEncoder;
use crate::errors::{ChargesError, Result};
use crate::gbdt::{from_fixed, to_fixed, Model};
use crate::record::{Applicant, NUMERIC_COLUMNS};
use serde::{Deserialize, Serialize};

/// Anything that can turn one applicant into a predicted charge.
///
/// Implementations must be safe to call concurrently through a shared
/// reference; the service holds a single instance behind an `Arc`.
pub trait ChargePredictor: Send + Sync {
    fn predict(&self, applicant: &Applicant) -> Result<f64>;
}

/// Fitted encoder + regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargesPipeline {
    pub encoder: OneHotEncoder,
    pub regressor: Model,
    /// Column names of the regressor input, in order
    pub feature_names: Vec<String>,
}

impl ChargesPipeline {
    pub fn new(encoder: OneHotEncoder, regressor: Model) -> Self {
        let feature_names = feature_names_for(&encoder);
        Self {
            encoder,
            regressor,
            feature_names,
        }
    }

    /// Build the regressor input: indicators first, then numeric passthrough
    pub fn feature_vector(&self, applicant: &Applicant) -> Vec<i64> {
        encode_features(&self.encoder, applicant)
    }

    /// Check that the encoder layout and regressor agree
    pub fn validate(&self) -> Result<()> {
        self.encoder
            .validate()
            .map_err(ChargesError::ValidationFailed)?;
        self.regressor.validate()?;

        let width = self.encoder.width() + NUMERIC_COLUMNS.len();
        if width != self.regressor.feature_count {
            return Err(ChargesError::FeatureWidth {
                expected: self.regressor.feature_count,
                got: width,
            });
        }
        if self.feature_names != feature_names_for(&self.encoder) {
            return Err(ChargesError::ValidationFailed(
                "feature names do not match encoder layout".to_string(),
            ));
        }

        Ok(())
    }
}

impl ChargePredictor for ChargesPipeline {
    fn predict(&self, applicant: &Applicant) -> Result<f64> {
        let features = self.feature_vector(applicant);
        let score = self.regressor.try_score(&features)?;
        Ok(from_fixed(score))
    }
}

/// Encode an applicant with a fitted encoder. Shared with the trainer so
/// training rows and served requests go through the same code path.
pub fn encode_features(encoder: &OneHotEncoder, applicant: &Applicant) -> Vec<i64> {
    let mut features = Vec::with_capacity(encoder.width() + NUMERIC_COLUMNS.len());
    encoder.transform_into(applicant, &mut features);
    features.extend(applicant.numeric().into_iter().map(to_fixed));
    features
}

/// Full regressor input names for an encoder layout
pub fn feature_names_for(encoder: &OneHotEncoder) -> Vec<String> {
    let mut names = encoder.feature_names();
    names.extend(NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbdt::{Node, Tree, SCALE};

    fn applicant(smoker: &str, region: &str) -> Applicant {
        Applicant {
            age: 30,
            sex: "male".into(),
            bmi: 25.0,
            children: 0,
            smoker: smoker.into(),
            region: region.into(),
        }
    }

    /// Stump on `smoker_yes` (feature 3): 5000 for non-smokers, 30000 otherwise
    fn pipeline() -> ChargesPipeline {
        let rows = vec![
            Applicant {
                sex: "female".into(),
                ..applicant("yes", "northeast")
            },
            applicant("no", "northwest"),
            applicant("no", "southeast"),
            applicant("yes", "southwest"),
        ];
        let encoder = OneHotEncoder::fit(&rows);
        let tree = Tree::new(
            vec![
                Node::internal(0, 3, SCALE / 2, 1, 2),
                Node::leaf(1, 5_000 * SCALE),
                Node::leaf(2, 30_000 * SCALE),
            ],
            SCALE,
        );
        let regressor = Model::new(encoder.width() + 3, vec![tree], 0);
        ChargesPipeline::new(encoder, regressor)
    }

    #[test]
    fn feature_vector_layout() {
        let p = pipeline();
        let features = p.feature_vector(&applicant("no", "southeast"));
        assert_eq!(features.len(), 11);
        assert_eq!(&features[8..], &[30 * SCALE, 25 * SCALE, 0]);
        assert_eq!(p.feature_names.len(), 11);
        assert_eq!(p.feature_names[8], "age");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn predict_composes_stages() {
        let p = pipeline();
        assert_eq!(p.predict(&applicant("no", "southeast")).unwrap(), 5_000.0);
        assert_eq!(p.predict(&applicant("yes", "southeast")).unwrap(), 30_000.0);
    }

    #[test]
    fn unknown_region_still_predicts() {
        let p = pipeline();
        let value = p.predict(&applicant("no", "mars")).unwrap();
        assert!(value.is_finite());
    }

    #[test]
    fn validate_rejects_width_mismatch() {
        let mut p = pipeline();
        p.regressor.feature_count = 5;
        p.regressor.trees.clear();
        assert!(matches!(
            p.validate(),
            Err(ChargesError::FeatureWidth { expected: 5, got: 11 })
        ));
    }
}
