//! Integration test: Full workflow (load → explore → split → select → evaluate → export)

use diagnosis_pipeline::config::{DataConfig, ExportConfig, WorkflowConfig};
use diagnosis_pipeline::data::synthetic::breast_cancer_like_default;
use diagnosis_pipeline::data::{DataLoader, BREAST_CANCER_FEATURES, BUNDLED_DATASET};
use diagnosis_pipeline::export::load_pipeline;
use diagnosis_pipeline::selection::ModelFamily;
use diagnosis_pipeline::workflow::Workflow;
use diagnosis_pipeline::PipelineError;
use std::path::Path;

mod common;
use common::write_dataset_csv;

#[test]
fn test_full_workflow_on_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("breast_cancer.csv");
    let artifact = dir.path().join("artifacts/model.bin");
    write_dataset_csv(&csv);

    let config = WorkflowConfig::default()
        .with_data(DataConfig::default().with_path(&csv))
        .with_export(ExportConfig {
            path: artifact.clone(),
            ..ExportConfig::default()
        });

    // Step 1: Load
    let dataset = DataLoader::new().load(&config.data).unwrap();
    assert_eq!(dataset.n_samples(), 569);
    assert_eq!(dataset.n_features(), 30, "id and target are not features");
    dataset.validate_schema(&BREAST_CANCER_FEATURES).unwrap();

    // Step 2: Run every stage
    let outcome = Workflow::new(config).run(&dataset).unwrap();

    assert_eq!(outcome.exploration.class_counts[0].count, 212);
    assert_eq!(outcome.exploration.mutual_information.len(), 30);
    assert_eq!(outcome.split.train + outcome.split.test, 569);
    assert_eq!(outcome.search.results.len(), 18);
    assert_eq!(outcome.search.n_splits, 5);
    assert!(outcome.search.results.iter().all(|r| r.fold_scores.len() == 5));

    let accuracy = outcome.evaluation.accuracy;
    assert!((0.90..=1.0).contains(&accuracy), "test accuracy {} too low", accuracy);
    assert_eq!(outcome.evaluation.confusion.total(), outcome.split.test);
    assert!(outcome.evaluation.class(0.0).is_some());

    // Step 3: The artifact reproduces the selected pipeline
    let (restored, metadata) = load_pipeline(&artifact).unwrap();
    let best = outcome.search.best();
    assert_eq!(metadata.model_family, best.candidate.family().to_string());
    assert_eq!(metadata.cv_score, Some(best.mean_score));
    assert_eq!(metadata.feature_names.len(), 30);
    assert_eq!(
        restored.predict(dataset.features()).unwrap(),
        outcome.pipeline.predict(dataset.features()).unwrap()
    );
    assert!(restored.model_columns().iter().any(|c| c == "radius_texture"));
}

#[test]
fn test_full_workflow_on_bundled_data() {
    let loader = DataLoader::new();
    if !Path::new(BUNDLED_DATASET).is_file() {
        let err = loader.load_bundled().unwrap_err();
        assert!(matches!(err, PipelineError::DataUnavailable { .. }));
        return;
    }

    let dataset = loader.load_bundled().unwrap();
    assert_eq!(dataset.n_samples(), 569);
    assert_eq!(dataset.n_features(), 30);
    dataset.validate_schema(&BREAST_CANCER_FEATURES).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let config = WorkflowConfig::default().with_export(ExportConfig {
        path: dir.path().join("model.bin"),
        ..ExportConfig::default()
    });
    let outcome = Workflow::new(config).run(&dataset).unwrap();

    assert_eq!(outcome.exploration.class_counts[0].count, 212);
    assert_eq!(outcome.search.results.len(), 18);
    let accuracy = outcome.evaluation.accuracy;
    assert!((0.90..=1.0).contains(&accuracy), "test accuracy {} too low", accuracy);
}

#[test]
fn test_workflow_is_deterministic() {
    let dataset = breast_cancer_like_default(7).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let run = |name: &str| {
        let config = WorkflowConfig::default().with_export(ExportConfig {
            path: dir.path().join(name),
            ..ExportConfig::default()
        });
        Workflow::new(config).run(&dataset).unwrap()
    };
    let first = run("a.bin");
    let second = run("b.bin");

    assert_eq!(first.search.best_index, second.search.best_index);
    assert_eq!(first.evaluation, second.evaluation);
    assert_eq!(first.exploration, second.exploration);
    assert!(matches!(
        first.search.best().candidate.family(),
        ModelFamily::LogisticRegression | ModelFamily::RandomForest | ModelFamily::Svc
    ));
}

#[test]
fn test_missing_dataset() {
    let config = DataConfig::default().with_path("/no/such/breast_cancer.csv");
    let err = DataLoader::new().load(&config).unwrap_err();
    assert!(matches!(err, PipelineError::DataUnavailable { .. }));
}

#[test]
fn test_missing_augment_source_column() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("data.csv");
    write_dataset_csv(&csv);

    let config = DataConfig::default()
        .with_path(&csv)
        .with_drop_columns(vec!["id".to_string(), "mean texture".to_string()]);
    let dataset = DataLoader::new().load(&config).unwrap();

    let workflow_config = WorkflowConfig::default().with_export(ExportConfig {
        path: dir.path().join("model.bin"),
        ..ExportConfig::default()
    });
    let err = Workflow::new(workflow_config).run(&dataset).unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "mean texture"));
}
