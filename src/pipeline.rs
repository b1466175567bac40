//! Fitted pipeline: ordered transform steps followed by a classifier

use crate::data::{column_names, columns_to_array2};
use crate::error::{PipelineError, Result};
use crate::models::{Estimator, Model};
use crate::preprocessing::{DegeneratePolicy, FeatureAugmenter, StandardScaler, Step, Transform};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Augment -> scale -> classify, as one serializable unit.
///
/// The same value is cloned for every cross-validation fold, refit on the
/// full training split and later restored from an artifact, so all three
/// paths run the identical composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    steps: Vec<Step>,
    estimator: Estimator,
    /// Input columns seen at fit time, in order
    input_columns: Vec<String>,
    /// Columns handed to the classifier, in order
    model_columns: Vec<String>,
    is_fitted: bool,
    /// Seconds spent in the last `fit`
    fit_time: Option<f64>,
}

impl Pipeline {
    /// Create an unfitted pipeline
    pub fn new(steps: Vec<Step>, estimator: Estimator) -> Self {
        Self {
            steps,
            estimator,
            input_columns: Vec::new(),
            model_columns: Vec::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    /// The standard composition: product feature, then z-scaling
    pub fn standard(augmenter: FeatureAugmenter, policy: DegeneratePolicy, estimator: Estimator) -> Self {
        Self::new(
            vec![Step::Augment(augmenter), Step::Scale(StandardScaler::new(policy))],
            estimator,
        )
    }

    /// Unfitted copy with the same steps and a different classifier
    pub fn with_estimator(&self, estimator: Estimator) -> Self {
        Self::new(self.steps.clone(), estimator)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn input_columns(&self) -> &[String] {
        &self.input_columns
    }

    pub fn model_columns(&self) -> &[String] {
        &self.model_columns
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    /// Fit each step on the previous step's output
    fn fit_steps(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let mut current = df.clone();
        for step in &mut self.steps {
            current = step.fit_transform(&current)?;
        }
        Ok(current)
    }

    fn transform_steps(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut current = df.clone();
        for step in &self.steps {
            current = step.transform(&current)?;
        }
        Ok(current)
    }

    /// Fit every step and then the classifier on `df` / `y`
    pub fn fit(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<()> {
        let start = Instant::now();

        if df.height() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels", df.height()),
                actual: format!("{} labels", y.len()),
            });
        }

        let transformed = self.fit_steps(df)?;
        let model_columns = column_names(&transformed);
        let x = columns_to_array2(&transformed, &model_columns)?;
        self.estimator.fit(&x, y)?;

        self.input_columns = column_names(df);
        self.model_columns = model_columns;
        self.is_fitted = true;
        self.fit_time = Some(start.elapsed().as_secs_f64());
        Ok(())
    }

    /// Feature matrix as the classifier sees it
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        for name in &self.input_columns {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingColumn(name.clone()));
            }
        }
        let ordered = df.select(self.input_columns.iter().map(String::as_str))?;
        self.transform_steps(&ordered)
    }

    /// Predict one label per row. Extra columns in `df` are ignored.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let transformed = self.transform(df)?;
        let x = columns_to_array2(&transformed, &self.model_columns)?;
        self.estimator.predict(&x)
    }

    /// Classifier importances paired with model column names, largest first
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.estimator.feature_importances()?;
        let mut pairs: Vec<(String, f64)> = self
            .model_columns
            .iter()
            .cloned()
            .zip(importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Some(pairs)
    }
}
