//! One-hot encoding of categorical columns
//!
//! Categories are learned per column as a sorted set, so the indicator order
//! is stable for a given training subset. Values never seen during fitting
//! encode to an all-zero indicator block instead of failing.

use crate::gbdt::SCALE;
use crate::record::{Applicant, CATEGORICAL_COLUMNS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Known categories for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

impl CategoricalColumn {
    fn encode_into(&self, value: &str, out: &mut Vec<i64>) {
        out.extend(
            self.categories
                .iter()
                .map(|category| if category == value { SCALE } else { 0 }),
        );
    }
}

/// Fitted one-hot encoder over `CATEGORICAL_COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub columns: Vec<CategoricalColumn>,
}

impl OneHotEncoder {
    /// Learn the category vocabulary of every categorical column.
    pub fn fit<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Applicant>,
    {
        let mut seen: Vec<BTreeSet<String>> = vec![BTreeSet::new(); CATEGORICAL_COLUMNS.len()];

        for row in rows {
            for (set, column) in seen.iter_mut().zip(CATEGORICAL_COLUMNS) {
                if let Some(value) = row.categorical(column) {
                    if !set.contains(value) {
                        set.insert(value.to_string());
                    }
                }
            }
        }

        let columns = CATEGORICAL_COLUMNS
            .iter()
            .zip(seen)
            .map(|(name, set)| CategoricalColumn {
                name: (*name).to_string(),
                categories: set.into_iter().collect(),
            })
            .collect();

        Self { columns }
    }

    /// Number of indicator columns produced
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.categories.len()).sum()
    }

    /// Encode one applicant's categorical fields as fixed-point indicators
    pub fn transform(&self, applicant: &Applicant) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.width());
        self.transform_into(applicant, &mut out);
        out
    }

    /// Append indicators to an existing feature buffer
    pub fn transform_into(&self, applicant: &Applicant, out: &mut Vec<i64>) {
        for column in &self.columns {
            let value = applicant.categorical(&column.name).unwrap_or_default();
            column.encode_into(value, out);
        }
    }

    /// Indicator names as `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|column| {
                column
                    .categories
                    .iter()
                    .map(move |category| format!("{}_{}", column.name, category))
            })
            .collect()
    }

    /// Reject encoders that cannot have come from `fit`
    pub fn validate(&self) -> Result<(), String> {
        if self.columns.len() != CATEGORICAL_COLUMNS.len() {
            return Err(format!(
                "expected {} categorical columns, found {}",
                CATEGORICAL_COLUMNS.len(),
                self.columns.len()
            ));
        }

        for (column, expected) in self.columns.iter().zip(CATEGORICAL_COLUMNS) {
            if column.name != expected {
                return Err(format!(
                    "categorical column order mismatch: expected {expected}, found {}",
                    column.name
                ));
            }
            if column.categories.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!(
                    "categories for {} are not sorted and unique",
                    column.name
                ));
            }
        }

        Ok(())
    }
}
