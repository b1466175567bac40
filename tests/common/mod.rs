//! Helpers shared by the integration tests
#![allow(dead_code)]

use diagnosis_pipeline::data::synthetic::breast_cancer_like_default;
use diagnosis_pipeline::data::DataSaver;
use diagnosis_pipeline::models::{Estimator, LogisticRegression};
use diagnosis_pipeline::pipeline::Pipeline;
use diagnosis_pipeline::preprocessing::{DegeneratePolicy, FeatureAugmenter};
use polars::prelude::*;
use std::path::Path;

/// Unfitted augment -> scale -> logistic regression pipeline
pub fn template() -> Pipeline {
    Pipeline::standard(
        FeatureAugmenter::default(),
        DegeneratePolicy::Identity,
        Estimator::LogisticRegression(LogisticRegression::default()),
    )
}

/// Write the generated dataset as the CSV layout the loader expects: an id
/// column, the 30 features and a 0/1 target column.
pub fn write_dataset_csv(path: &Path) {
    let dataset = breast_cancer_like_default(42).unwrap();
    let mut df = dataset.features().clone();
    let ids: Vec<i64> = (0..dataset.n_samples() as i64).map(|i| 840_000 + i).collect();
    df.with_column(Series::new("id".into(), ids)).unwrap();
    df.with_column(Series::new("target".into(), dataset.target().to_vec())).unwrap();
    DataSaver::save_csv(&mut df, path).unwrap();
}
