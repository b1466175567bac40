//! Product-feature augmentation

use super::Transform;
use crate::data::column_values;
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Appends `output = left * right` to a feature table.
///
/// Stateless: `fit` does nothing, so train-shaped and test-shaped tables go
/// through the exact same computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAugmenter {
    left: String,
    right: String,
    output: String,
}

impl Default for FeatureAugmenter {
    fn default() -> Self {
        Self::new("mean radius", "mean texture", "radius_texture")
    }
}

impl FeatureAugmenter {
    pub fn new(left: impl Into<String>, right: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            output: output.into(),
        }
    }

    /// Source column names
    pub fn sources(&self) -> (&str, &str) {
        (&self.left, &self.right)
    }

    /// Name of the derived column
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Return a copy of `df` with the derived column appended
    pub fn augment(&self, df: &DataFrame) -> Result<DataFrame> {
        for name in [&self.left, &self.right] {
            if df.column(name).is_err() {
                return Err(PipelineError::MissingColumn(name.clone()));
            }
        }
        if df.column(&self.output).is_ok() {
            return Err(PipelineError::ValidationError(format!(
                "derived column '{}' already exists",
                self.output
            )));
        }

        let left = column_values(df, &self.left)?;
        let right = column_values(df, &self.right)?;
        let product: Vec<f64> = left.iter().zip(&right).map(|(a, b)| a * b).collect();

        let mut result = df.clone();
        result.with_column(Series::new(self.output.as_str().into(), product))?;
        Ok(result)
    }
}

impl Transform for FeatureAugmenter {
    fn fit(&mut self, _df: &DataFrame) -> Result<()> {
        Ok(())
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.augment(df)
    }
}
