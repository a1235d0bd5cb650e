//! Charges Trainer - Deterministic offline pipeline trainer
//!
//! Loads the insurance CSV, splits it with a fixed seed, fits the one-hot
//! encoder and the GBDT on the training portion, scores both portions and
//! writes a single verified artifact.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod trainer;

use charges_core::pipeline::encode_features;
use charges_core::{
    to_fixed, Artifact, ArtifactMetadata, ChargePredictor, ChargesPipeline, OneHotEncoder,
    RegressionMetrics, TrainingSummary, NUMERIC_COLUMNS,
};
use std::path::Path;
use tracing::info;

pub use dataset::{Dataset, DatasetSplit};
pub use deterministic::{LcgRng, SplitTieBreaker, HOLDOUT_PERCENT, SPLIT_SEED};
pub use errors::TrainerError;
pub use trainer::{GbdtConfig, GbdtTrainer, TrainedModel};

/// Everything that determines a training run besides the data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingParams {
    pub gbdt: GbdtConfig,
    pub seed: i64,
    pub holdout_percent: usize,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            gbdt: GbdtConfig::default(),
            seed: SPLIT_SEED,
            holdout_percent: HOLDOUT_PERCENT,
        }
    }
}

/// Fitted pipeline plus per-feature importance, aligned with
/// `pipeline.feature_names`
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub pipeline: ChargesPipeline,
    pub feature_importance: Vec<f64>,
}

/// Fit encoder and regressor on `train` only.
pub fn fit_pipeline(train: &Dataset, config: &GbdtConfig) -> Result<FittedPipeline, TrainerError> {
    let encoder = OneHotEncoder::fit(&train.records);

    let features: Vec<Vec<i64>> = train
        .records
        .iter()
        .map(|record| encode_features(&encoder, record))
        .collect();
    let targets: Vec<i64> = train.targets.iter().map(|&t| to_fixed(t)).collect();

    let trained = GbdtTrainer::new(config.clone()).train(&features, &targets)?;
    let pipeline = ChargesPipeline::new(encoder, trained.model);
    pipeline.validate()?;

    Ok(FittedPipeline {
        pipeline,
        feature_importance: trained.feature_importance,
    })
}

/// Score a pipeline against labeled rows
pub fn evaluate<P: ChargePredictor + ?Sized>(
    predictor: &P,
    dataset: &Dataset,
) -> Result<RegressionMetrics, TrainerError> {
    let predictions = dataset
        .records
        .iter()
        .map(|record| predictor.predict(record))
        .collect::<charges_core::Result<Vec<f64>>>()?;

    Ok(RegressionMetrics::compute(&dataset.targets, &predictions)?)
}

/// Run the full pipeline in memory and return the artifact without saving it
pub fn train_artifact(input: &Path, params: &TrainingParams) -> Result<Artifact, TrainerError> {
    let (dataset, dataset_hash) = Dataset::from_csv_hashed(input)?;
    info!("Loaded {} rows from {}", dataset.len(), input.display());
    for (name, (min, max)) in NUMERIC_COLUMNS.iter().zip(dataset.numeric_stats()) {
        info!("  {name}: min={min}, max={max}");
    }

    let split = dataset.split(params.seed, params.holdout_percent)?;
    info!(
        train = split.train.len(),
        holdout = split.holdout.len(),
        seed = params.seed,
        "dataset split"
    );

    let fitted = fit_pipeline(&split.train, &params.gbdt)?;
    let train_metrics = evaluate(&fitted.pipeline, &split.train)?;
    let holdout_metrics = evaluate(&fitted.pipeline, &split.holdout)?;

    let feature_importance = fitted
        .pipeline
        .feature_names
        .iter()
        .cloned()
        .zip(fitted.feature_importance.iter().copied())
        .collect();

    let metadata = ArtifactMetadata {
        created_at: chrono::Utc::now().timestamp(),
        crate_version: VERSION.to_string(),
        dataset_hash,
        training: TrainingSummary {
            train_rows: split.train.len(),
            holdout_rows: split.holdout.len(),
            split_seed: params.seed,
            parameters: params.gbdt.as_parameters(),
            train_metrics,
            holdout_metrics,
            feature_importance,
        },
    };

    Ok(Artifact::new(fitted.pipeline, metadata)?)
}

/// Train and persist. Nothing is written unless every step succeeds.
pub fn run_training(
    input: &Path,
    output: &Path,
    params: &TrainingParams,
) -> Result<Artifact, TrainerError> {
    let artifact = train_artifact(input, params)?;
    artifact.save(output)?;
    info!(path = %output.display(), hash = %artifact.model_hash, "artifact saved");
    Ok(artifact)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
