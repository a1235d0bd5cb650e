//! End-to-end tests for the charges trainer
//!
//! Train on checked-in fixtures, persist, reload and predict.

use anyhow::Result;
use charges_core::serde_canon::hash_bytes_hex;
use charges_core::{Applicant, Artifact, ChargePredictor, ChargesError};
use charges_trainer::{
    run_training, train_artifact, Dataset, TrainerError, TrainingParams, SPLIT_SEED,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn applicant(
    age: i64,
    sex: &str,
    bmi: f64,
    children: i64,
    smoker: &str,
    region: &str,
) -> Applicant {
    Applicant {
        age,
        sex: sex.to_string(),
        bmi,
        children,
        smoker: smoker.to_string(),
        region: region.to_string(),
    }
}

fn sample_applicants() -> Vec<Applicant> {
    vec![
        applicant(19, "female", 27.9, 0, "yes", "southwest"),
        applicant(33, "male", 22.7, 0, "no", "northwest"),
        applicant(46, "female", 33.4, 1, "no", "southeast"),
        applicant(60, "male", 25.8, 0, "no", "northeast"),
        applicant(52, "female", 30.2, 1, "yes", "northwest"),
    ]
}

#[derive(Deserialize)]
struct GoldenFile {
    tolerance: f64,
    cases: Vec<GoldenCase>,
}

#[derive(Deserialize)]
struct GoldenCase {
    request: Applicant,
    predicted_charge: f64,
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let input = fixture("insurance_sample.csv");
    let params = TrainingParams::default();

    let first = train_artifact(&input, &params)?;
    let second = train_artifact(&input, &params)?;

    assert_eq!(first.model_hash, second.model_hash, "Model hash should be identical");
    assert_eq!(first.pipeline, second.pipeline);
    assert_eq!(first.metadata.training, second.metadata.training);
    assert_eq!(first.metadata.dataset_hash, second.metadata.dataset_hash);

    for applicant in sample_applicants() {
        assert_eq!(
            first.pipeline.predict(&applicant)?,
            second.pipeline.predict(&applicant)?
        );
    }

    Ok(())
}

#[test]
fn test_split_is_reproducible() -> Result<()> {
    let dataset = Dataset::from_csv(fixture("insurance_sample.csv"))?;
    let a = dataset.split(SPLIT_SEED, 20)?;
    let b = dataset.split(SPLIT_SEED, 20)?;

    assert_eq!(a.holdout.len(), 40);
    assert_eq!(a.train.len(), 160);
    assert_eq!(a.train.records, b.train.records);
    assert_eq!(a.holdout.records, b.holdout.records);
    Ok(())
}

/// Train on `dataset` with default parameters and compare against recorded predictions
fn assert_matches_golden(dataset: &str, golden: &str) -> Result<()> {
    let artifact = train_artifact(&fixture(dataset), &TrainingParams::default())?;
    let golden: GoldenFile = serde_json::from_str(&std::fs::read_to_string(fixture(golden))?)?;

    assert!(!golden.cases.is_empty());
    for case in &golden.cases {
        let predicted = artifact.pipeline.predict(&case.request)?;
        assert!(
            (predicted - case.predicted_charge).abs() <= golden.tolerance,
            "{:?}: predicted {predicted}, expected {}",
            case.request,
            case.predicted_charge
        );
    }
    Ok(())
}

#[test]
fn test_golden_predictions() -> Result<()> {
    assert_matches_golden("golden_insurance.csv", "golden_predictions.json")
}

// Recorded from a default run on insurance_sample.csv. Pins the numeric
// columns too: each of age, bmi and children moves the prediction.
#[test]
fn test_recorded_sample_predictions() -> Result<()> {
    assert_matches_golden("insurance_sample.csv", "sample_predictions.json")
}

#[test]
fn test_dataset_hash_covers_parsed_bytes() -> Result<()> {
    let input = fixture("insurance_sample.csv");
    let artifact = train_artifact(&input, &TrainingParams::default())?;

    assert_eq!(artifact.metadata.dataset_hash, hash_bytes_hex(&std::fs::read(&input)?));
    Ok(())
}

#[test]
fn test_smoker_effect() -> Result<()> {
    let artifact = train_artifact(&fixture("insurance_sample.csv"), &TrainingParams::default())?;

    let non_smoker = applicant(40, "male", 30.0, 1, "no", "southeast");
    let smoker = Applicant {
        smoker: "yes".to_string(),
        ..non_smoker.clone()
    };

    let delta = artifact.pipeline.predict(&smoker)? - artifact.pipeline.predict(&non_smoker)?;
    assert!(delta > 10_000.0, "smoker effect too small: {delta}");
    Ok(())
}

#[test]
fn test_unknown_category_still_predicts() -> Result<()> {
    let artifact = train_artifact(&fixture("insurance_sample.csv"), &TrainingParams::default())?;

    let prediction = artifact
        .pipeline
        .predict(&applicant(40, "male", 30.0, 1, "no", "mars"))?;
    assert!(prediction.is_finite());
    Ok(())
}

#[test]
fn test_metadata_is_populated() -> Result<()> {
    let artifact = train_artifact(&fixture("insurance_sample.csv"), &TrainingParams::default())?;
    let training = &artifact.metadata.training;

    assert_eq!(training.train_rows, 160);
    assert_eq!(training.holdout_rows, 40);
    assert_eq!(training.split_seed, SPLIT_SEED);
    assert_eq!(training.parameters["num_trees"], 100);
    assert_eq!(artifact.pipeline.regressor.num_trees(), 100);
    assert!(training.train_metrics.r2 > 0.9);
    assert!(training.holdout_metrics.r2 > 0.5);

    let total: f64 = training.feature_importance.values().sum();
    assert!((total - 1.0).abs() < 1e-9);
    let top = training
        .feature_importance
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(name, _)| name.as_str());
    assert!(matches!(top, Some("smoker_no") | Some("smoker_yes")));
    Ok(())
}

#[test]
fn test_saved_artifact_reloads_identically() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("models").join("charges_model.json");

    let params = TrainingParams::default();
    let trained = run_training(&fixture("insurance_sample.csv"), &output, &params)?;
    let first = Artifact::load(&output)?;
    let second = Artifact::load(&output)?;

    assert_eq!(first.model_hash, trained.model_hash);
    for applicant in sample_applicants() {
        let a = first.pipeline.predict(&applicant)?;
        let b = second.pipeline.predict(&applicant)?;
        assert_eq!(a, b);
        assert_eq!(a, trained.pipeline.predict(&applicant)?);
    }
    Ok(())
}

#[test]
fn test_failed_run_keeps_previous_artifact() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("charges_model.json");
    run_training(&fixture("insurance_sample.csv"), &output, &TrainingParams::default())?;
    let before = std::fs::read(&output)?;

    let broken = dir.path().join("broken.csv");
    std::fs::write(
        &broken,
        "age,sex,bmi,children,smoker,region,charges\n19,female,27.9,0,yes,southwest,not-a-number\n",
    )?;

    let err = run_training(&broken, &output, &TrainingParams::default()).unwrap_err();
    assert!(matches!(err, TrainerError::Dataset(_)));
    assert_eq!(std::fs::read(&output)?, before);

    let missing = run_training(&dir.path().join("absent.csv"), &output, &TrainingParams::default());
    assert!(missing.is_err());
    assert_eq!(std::fs::read(&output)?, before);
    Ok(())
}

#[test]
fn test_tampered_artifact_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("charges_model.json");
    run_training(&fixture("golden_insurance.csv"), &output, &TrainingParams::default())?;

    let mut value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    value["pipeline"]["regressor"]["bias"] = serde_json::json!(1);
    std::fs::write(&output, serde_json::to_string(&value)?)?;

    let err = Artifact::load(&output).unwrap_err();
    assert!(matches!(err, ChargesError::HashMismatch { .. }));
    Ok(())
}
