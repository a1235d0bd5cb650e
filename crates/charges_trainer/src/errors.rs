use charges_core::ChargesError;
use thiserror::Error;

/// Errors returned by the deterministic trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error(transparent)]
    Model(#[from] ChargesError),
}

impl From<csv::Error> for TrainerError {
    fn from(err: csv::Error) -> Self {
        TrainerError::Dataset(err.to_string())
    }
}
