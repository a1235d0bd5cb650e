//! Applicant record and column layout

use serde::{Deserialize, Serialize};

/// Categorical predictor columns, in feature-vector order
pub const CATEGORICAL_COLUMNS: [&str; 3] = ["sex", "smoker", "region"];

/// Numeric passthrough columns, appended after the indicators
pub const NUMERIC_COLUMNS: [&str; 3] = ["age", "bmi", "children"];

/// Training target column
pub const TARGET_COLUMN: &str = "charges";

/// One applicant's six predictor attributes.
///
/// Categorical values are kept as free-form strings: values outside the
/// training vocabulary are legal and encode to all-zero indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub age: i64,
    pub sex: String,
    pub bmi: f64,
    pub children: i64,
    pub smoker: String,
    pub region: String,
}

impl Applicant {
    /// Value of a categorical column by name
    pub fn categorical(&self, column: &str) -> Option<&str> {
        match column {
            "sex" => Some(&self.sex),
            "smoker" => Some(&self.smoker),
            "region" => Some(&self.region),
            _ => None,
        }
    }

    /// Numeric passthrough values in `NUMERIC_COLUMNS` order
    pub fn numeric(&self) -> [f64; 3] {
        [self.age as f64, self.bmi, self.children as f64]
    }
}
