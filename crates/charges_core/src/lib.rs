//! Model core for the insurance charges predictor
//!
//! Holds everything shared by the offline trainer and the online service:
//!
//! Modules:
//! - `record`: the six-attribute applicant record and column names
//! - `encoding`: one-hot encoder with ignore-unknown semantics
//! - `gbdt`: integer-only gradient boosted tree ensemble
//! - `pipeline`: encoder + regressor composed behind `ChargePredictor`
//! - `artifact`: on-disk format, hashing, atomic save and verified load
//! - `metrics`: R², RMSE and MAE for evaluation reports
//! - `serde_canon`: canonical JSON and blake3 helpers
//! - `errors`: crate error type

pub mod artifact;
pub mod encoding;
pub mod errors;
pub mod gbdt;
pub mod metrics;
pub mod pipeline;
pub mod record;
pub mod serde_canon;

pub use artifact::{
    Artifact, ArtifactMetadata, TrainingSummary, ARTIFACT_FORMAT_VERSION, DEFAULT_ARTIFACT_PATH,
};
pub use encoding::{CategoricalColumn, OneHotEncoder};
pub use errors::{ChargesError, Result};
pub use gbdt::{from_fixed, to_fixed, Model, Node, Tree, SCALE};
pub use metrics::RegressionMetrics;
pub use pipeline::{ChargePredictor, ChargesPipeline};
pub use record::{Applicant, CATEGORICAL_COLUMNS, NUMERIC_COLUMNS, TARGET_COLUMN};

/// Crate version string, recorded in artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
