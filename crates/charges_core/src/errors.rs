//! Error types for the model core

use thiserror::Error;

/// Errors raised while building, loading or evaluating a pipeline
#[derive(Error, Debug)]
pub enum ChargesError {
    /// Model or artifact structure is invalid
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    /// Artifact was written by an incompatible format version
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Stored hash does not match the artifact contents
    #[error("Artifact hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch { stored: String, computed: String },

    /// Feature vector does not match the regressor input width
    #[error("Feature width mismatch: expected {expected}, got {got}")]
    FeatureWidth { expected: usize, got: usize },

    /// Evaluation inputs are unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for model core operations
pub type Result<T> = std::result::Result<T, ChargesError>;
