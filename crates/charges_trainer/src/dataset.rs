//! CSV dataset loading and deterministic splitting
//!
//! Reads `age,sex,bmi,children,smoker,region,charges` rows. Every column is
//! required; any missing column, empty cell or unparsable value aborts the
//! load.

use charges_core::serde_canon::hash_bytes_hex;
use charges_core::{Applicant, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS, TARGET_COLUMN};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::deterministic::{holdout_len, shuffled_indices};
use crate::errors::TrainerError;

/// One raw CSV row
#[derive(Debug, Deserialize)]
struct InsuranceRow {
    age: i64,
    sex: String,
    bmi: f64,
    children: i64,
    smoker: String,
    region: String,
    charges: f64,
}

/// Labeled training records
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub records: Vec<Applicant>,
    pub targets: Vec<f64>,
}

/// Result of the train/holdout partition
#[derive(Clone, Debug)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub holdout: Dataset,
}

impl Dataset {
    /// Load dataset from CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self, TrainerError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            TrainerError::Dataset(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_reader(file)
    }

    /// Load a CSV file together with the blake3 hex of exactly the bytes parsed
    pub fn from_csv_hashed<P: AsRef<Path>>(path: P) -> Result<(Self, String), TrainerError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            TrainerError::Dataset(format!("failed to read {}: {e}", path.display()))
        })?;
        let hash = hash_bytes_hex(&bytes);
        Ok((Self::from_reader(bytes.as_slice())?, hash))
    }

    /// Load dataset from any CSV source with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TrainerError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let required = NUMERIC_COLUMNS
            .iter()
            .chain(CATEGORICAL_COLUMNS.iter())
            .chain(std::iter::once(&TARGET_COLUMN));
        for column in required {
            if !headers.iter().any(|h| h == *column) {
                return Err(TrainerError::Dataset(format!(
                    "missing required column '{column}'"
                )));
            }
        }

        let mut dataset = Dataset::default();
        for (line_idx, row) in csv_reader.deserialize::<InsuranceRow>().enumerate() {
            // Header is line 1
            let row = row.map_err(|e| {
                TrainerError::Dataset(format!("line {}: {e}", line_idx + 2))
            })?;

            if !row.bmi.is_finite() || !row.charges.is_finite() {
                return Err(TrainerError::Dataset(format!(
                    "line {}: non-finite numeric value",
                    line_idx + 2
                )));
            }

            dataset.records.push(Applicant {
                age: row.age,
                sex: row.sex,
                bmi: row.bmi,
                children: row.children,
                smoker: row.smoker,
                region: row.region,
            });
            dataset.targets.push(row.charges);
        }

        if dataset.is_empty() {
            return Err(TrainerError::Dataset("Dataset is empty".to_string()));
        }

        Ok(dataset)
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Partition into training and holdout subsets.
    ///
    /// Rows are permuted with a seeded shuffle; the first
    /// `ceil(n * holdout_percent / 100)` form the holdout, the rest train.
    pub fn split(&self, seed: i64, holdout_percent: usize) -> Result<DatasetSplit, TrainerError> {
        let n = self.len();
        let holdout = holdout_len(n, holdout_percent);
        if holdout == 0 || holdout >= n {
            return Err(TrainerError::Dataset(format!(
                "cannot split {n} rows with a {holdout_percent}% holdout"
            )));
        }

        let order = shuffled_indices(n, seed);
        let (holdout_idx, train_idx) = order.split_at(holdout);

        Ok(DatasetSplit {
            train: self.select(train_idx),
            holdout: self.select(holdout_idx),
        })
    }

    /// (min, max) of each numeric column, in `NUMERIC_COLUMNS` order
    pub fn numeric_stats(&self) -> Vec<(f64, f64)> {
        let mut stats = vec![(f64::INFINITY, f64::NEG_INFINITY); NUMERIC_COLUMNS.len()];

        for record in &self.records {
            for (stat, value) in stats.iter_mut().zip(record.numeric()) {
                stat.0 = stat.0.min(value);
                stat.1 = stat.1.max(value);
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deterministic::{HOLDOUT_PERCENT, SPLIT_SEED};

    const SAMPLE: &str = "\
age,sex,bmi,children,smoker,region,charges
19,female,27.9,0,yes,southwest,16884.924
18,male,33.77,1,no,southeast,1725.5523
28,male,33,3,no,southeast,4449.462
33,male,22.705,0,no,northwest,21984.47061
32,male,28.88,0,no,northwest,3866.8552
";

    #[test]
    fn test_load_csv() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.records[0].age, 19);
        assert_eq!(dataset.records[0].sex, "female");
        assert_eq!(dataset.records[2].bmi, 33.0);
        assert_eq!(dataset.targets[0], 16884.924);
    }

    #[test]
    fn test_hashed_load_matches_file_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, SAMPLE.as_bytes()).unwrap();

        let (dataset, hash) = Dataset::from_csv_hashed(file.path()).unwrap();
        assert_eq!(dataset.len(), 5);
        assert_eq!(hash, hash_bytes_hex(SAMPLE.as_bytes()));
        assert!(Dataset::from_csv_hashed(file.path().with_extension("missing")).is_err());
    }

    #[test]
    fn test_column_order_is_free() {
        let csv = "charges,region,smoker,children,bmi,sex,age\n100.5,northeast,no,2,20.1,male,44\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.records[0].age, 44);
        assert_eq!(dataset.targets[0], 100.5);
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let csv = "age,sex,bmi,children,region,charges\n19,female,27.9,0,southwest,16884.924\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("smoker"));
    }

    #[test]
    fn test_bad_value_reports_line() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n\
                   19,female,27.9,0,yes,southwest,1\n\
                   x,male,1,0,no,northeast,2\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_empty_cell_is_rejected() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n19,female,,0,yes,southwest,1\n";
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_header_only_is_empty() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n";
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let first = dataset.split(SPLIT_SEED, HOLDOUT_PERCENT).unwrap();
        let second = dataset.split(SPLIT_SEED, HOLDOUT_PERCENT).unwrap();

        assert_eq!(first.holdout.len(), 1);
        assert_eq!(first.train.len(), 4);
        assert_eq!(first.train.records, second.train.records);
        assert_eq!(first.holdout.targets, second.holdout.targets);

        let mut all: Vec<f64> = first
            .train
            .targets
            .iter()
            .chain(&first.holdout.targets)
            .copied()
            .collect();
        all.sort_by(f64::total_cmp);
        let mut expected = dataset.targets.clone();
        expected.sort_by(f64::total_cmp);
        assert_eq!(all, expected);
    }

    #[test]
    fn test_single_row_cannot_split() {
        let csv = "age,sex,bmi,children,smoker,region,charges\n19,female,27.9,0,yes,southwest,1\n";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert!(dataset.split(SPLIT_SEED, HOLDOUT_PERCENT).is_err());
    }

    #[test]
    fn test_numeric_stats() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let stats = dataset.numeric_stats();
        assert_eq!(stats[0], (18.0, 33.0));
        assert_eq!(stats[1], (22.705, 33.77));
        assert_eq!(stats[2], (0.0, 3.0));
    }
}
