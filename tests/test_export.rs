//! Integration test: artifact round trips and write failures

use diagnosis_pipeline::data::synthetic::breast_cancer_like;
use diagnosis_pipeline::export::{load_pipeline, save_pipeline, ModelMetadata, SerializationFormat};
use diagnosis_pipeline::models::{Estimator, RandomForest};
use diagnosis_pipeline::pipeline::Pipeline;
use diagnosis_pipeline::preprocessing::{DegeneratePolicy, FeatureAugmenter};
use diagnosis_pipeline::PipelineError;
use std::collections::BTreeMap;

fn fitted_forest() -> (Pipeline, diagnosis_pipeline::data::Dataset) {
    let dataset = breast_cancer_like(30, 45, 21).unwrap();
    let mut pipeline = Pipeline::standard(
        FeatureAugmenter::default(),
        DegeneratePolicy::Identity,
        Estimator::RandomForest(RandomForest::new(15).with_random_state(42)),
    );
    pipeline.fit(dataset.features(), dataset.target()).unwrap();
    (pipeline, dataset)
}

fn metadata() -> ModelMetadata {
    let mut params = BTreeMap::new();
    params.insert("n_estimators".to_string(), "15".to_string());
    ModelMetadata::new("forest")
        .with_model_family("random_forest")
        .with_hyperparameters(params)
        .with_cv_score("accuracy", 0.93)
}

#[test]
fn test_round_trip_preserves_predictions() {
    let (pipeline, dataset) = fitted_forest();
    let expected = pipeline.predict(dataset.features()).unwrap();
    let dir = tempfile::tempdir().unwrap();

    for (file, format) in [("m.bin", SerializationFormat::Binary), ("m.json", SerializationFormat::Json)] {
        let path = dir.path().join(file);
        save_pipeline(&pipeline, &metadata(), &path, format).unwrap();

        let (restored, meta) = load_pipeline(&path).unwrap();
        assert_eq!(restored.predict(dataset.features()).unwrap(), expected);
        assert_eq!(meta.model_family, "random_forest");
        assert_eq!(meta.hyperparameters["n_estimators"], "15");
        assert_eq!(meta.cv_score, Some(0.93));
        assert_eq!(restored.input_columns(), pipeline.input_columns());
    }
}

#[test]
fn test_restored_pipeline_ignores_column_order() {
    let (pipeline, dataset) = fitted_forest();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/dir/model.bin");
    save_pipeline(&pipeline, &metadata(), &path, SerializationFormat::Binary).unwrap();
    let (restored, _) = load_pipeline(&path).unwrap();

    let mut reversed: Vec<String> = dataset.feature_names();
    reversed.reverse();
    let shuffled = dataset.features().select(reversed).unwrap();

    assert_eq!(
        restored.predict(&shuffled).unwrap(),
        pipeline.predict(dataset.features()).unwrap()
    );
}

#[test]
fn test_unwritable_destination() {
    let (pipeline, _) = fitted_forest();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();

    let err = save_pipeline(&pipeline, &metadata(), blocker.join("model.bin"), SerializationFormat::Binary)
        .unwrap_err();
    assert!(matches!(err, PipelineError::ArtifactWriteFailure { .. }));
}

#[test]
fn test_missing_artifact() {
    let err = load_pipeline("/no/such/model.bin").unwrap_err();
    assert!(matches!(err, PipelineError::DataUnavailable { .. }));
}
