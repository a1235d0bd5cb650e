//! Charges Trainer CLI
//!
//! Fits the encoder + GBDT pipeline on the insurance CSV and writes one
//! artifact for the prediction service.

use anyhow::{Context, Result};
use charges_core::DEFAULT_ARTIFACT_PATH;
use charges_trainer::{run_training, GbdtConfig, TrainingParams, HOLDOUT_PERCENT};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "charges-train")]
#[command(author = "Charges Predictor Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train the insurance charges regression pipeline", long_about = None)]
struct Args {
    /// Input CSV dataset (age,sex,bmi,children,smoker,region,charges)
    #[arg(short, long, default_value = "insurance.csv")]
    input: PathBuf,

    /// Artifact output path
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
    output: PathBuf,

    /// Number of boosting trees
    #[arg(long, default_value = "100")]
    trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value = "3")]
    max_depth: usize,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Learning rate (fixed-point, e.g., 100000 = 0.1)
    #[arg(long, default_value = "100000")]
    learning_rate: i64,

    /// Seed for the train/holdout shuffle
    #[arg(long, default_value = "42")]
    seed: i64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Charges Trainer v{}", env!("CARGO_PKG_VERSION"));

    let params = TrainingParams {
        gbdt: GbdtConfig {
            num_trees: args.trees,
            max_depth: args.max_depth,
            min_samples_split: args.min_samples_split,
            min_samples_leaf: args.min_samples_leaf,
            learning_rate: args.learning_rate,
        },
        seed: args.seed,
        holdout_percent: HOLDOUT_PERCENT,
    };

    info!("Training configuration:");
    info!("  Trees: {}", params.gbdt.num_trees);
    info!("  Max depth: {}", params.gbdt.max_depth);
    info!("  Min samples split: {}", params.gbdt.min_samples_split);
    info!("  Min samples per leaf: {}", params.gbdt.min_samples_leaf);
    info!("  Learning rate: {} (fixed-point)", params.gbdt.learning_rate);
    info!("  Split seed: {} ({}% holdout)", params.seed, params.holdout_percent);

    let artifact = run_training(&args.input, &args.output, &params)
        .with_context(|| format!("Training on {} failed", args.input.display()))?;
    let summary = &artifact.metadata.training;

    for (label, metrics) in [
        ("train", &summary.train_metrics),
        ("holdout", &summary.holdout_metrics),
    ] {
        info!(
            "{label:>7}: R²={:.4} RMSE={:.2} MAE={:.2} (n={})",
            metrics.r2, metrics.rmse, metrics.mae, metrics.samples
        );
    }

    let mut importance: Vec<_> = summary.feature_importance.iter().collect();
    importance.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    info!("Feature importance:");
    for (name, value) in importance {
        info!("  {name}: {value:.4}");
    }

    info!("✓ Training completed successfully");
    info!("  Model: {}", args.output.display());
    info!("  Hash: {}", artifact.model_hash);

    Ok(())
}
