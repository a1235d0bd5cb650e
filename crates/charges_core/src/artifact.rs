//! Persisted pipeline artifact
//!
//! One canonical JSON document holding the fitted pipeline, its blake3 hash
//! and training metadata. Saving goes through a temp file in the target
//! directory followed by a rename, so readers only ever observe a complete
//! previous artifact or a complete new one. Loading re-derives the hash and
//! validates the pipeline before handing it out.

use crate::errors::{ChargesError, Result};
use crate::metrics::RegressionMetrics;
use crate::pipeline::ChargesPipeline;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Artifact layout version understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Where the trainer writes and the service reads by default
pub const DEFAULT_ARTIFACT_PATH: &str = "models/charges_model.json";

/// What the trainer learned about the fit, kept for inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub train_rows: usize,
    pub holdout_rows: usize,
    pub split_seed: i64,
    /// Boosting parameters as fixed-point or integer values
    pub parameters: BTreeMap<String, i64>,
    pub train_metrics: RegressionMetrics,
    pub holdout_metrics: RegressionMetrics,
    /// Normalized total split gain per feature name
    pub feature_importance: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Unix seconds
    pub created_at: i64,
    pub crate_version: String,
    /// Blake3 hex of the raw dataset file
    pub dataset_hash: String,
    pub training: TrainingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub format_version: u32,
    /// Blake3 hex of the canonical pipeline JSON
    pub model_hash: String,
    pub pipeline: ChargesPipeline,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    /// Wrap a fitted pipeline, computing its content hash
    pub fn new(pipeline: ChargesPipeline, metadata: ArtifactMetadata) -> Result<Self> {
        pipeline.validate()?;
        let model_hash = hash_canonical_hex(&pipeline)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_hash,
            pipeline,
            metadata,
        })
    }

    /// Atomically write the artifact, replacing any existing file at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = to_canonical_json(self)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| ChargesError::Io(e.error))?;

        debug!(path = %path.display(), bytes = json.len(), "artifact written");
        Ok(())
    }

    /// Read, version-check, hash-check and validate an artifact.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;

        // Check the version before the typed decode so an incompatible layout
        // reports as such instead of as a missing field.
        let found = value
            .get("format_version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                ChargesError::ValidationFailed("artifact has no format_version".to_string())
            })?;
        if found != u64::from(ARTIFACT_FORMAT_VERSION) {
            return Err(ChargesError::UnsupportedVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }

        let artifact: Artifact = serde_json::from_value(value)?;

        let computed = hash_canonical_hex(&artifact.pipeline)?;
        if computed != artifact.model_hash {
            return Err(ChargesError::HashMismatch {
                stored: artifact.model_hash,
                computed,
            });
        }

        artifact.pipeline.validate()?;
        Ok(artifact)
    }

    pub fn into_pipeline(self) -> ChargesPipeline {
        self.pipeline
    }
}
