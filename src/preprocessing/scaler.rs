//! Standard (z-score) scaling

use super::Transform;
use crate::data::{column_names, column_values};
use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do with a column whose training standard deviation is zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Centre the column but leave its scale unchanged (scale factor 1.0)
    #[default]
    Identity,
    /// Refuse to fit
    Error,
}

/// Parameters for one fitted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ColumnParams {
    name: String,
    mean: f64,
    scale: f64,
    degenerate: bool,
}

/// Per-column standard scaler: `(x - mean) / std`.
///
/// Statistics are population moments (ddof = 0) of the data passed to `fit`;
/// `transform` only ever reuses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    policy: DegeneratePolicy,
    params: Vec<ColumnParams>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new(DegeneratePolicy::default())
    }
}

impl StandardScaler {
    /// Create a new scaler
    pub fn new(policy: DegeneratePolicy) -> Self {
        Self {
            policy,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted (mean, scale) for a column
    pub fn column_params(&self, name: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| (p.mean, p.scale))
    }

    /// Columns that had zero variance at fit time
    pub fn degenerate_columns(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.degenerate)
            .map(|p| p.name.as_str())
            .collect()
    }

    fn compute_params(&self, name: &str, values: &[f64]) -> Result<ColumnParams> {
        let n = values.len();
        if n == 0 {
            return Err(PipelineError::ValidationError(format!(
                "cannot fit scaler on empty column '{}'",
                name
            )));
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();

        let degenerate = !(std > 1e-12 * mean.abs().max(1.0));
        if degenerate {
            match self.policy {
                DegeneratePolicy::Error => {
                    return Err(PipelineError::DegenerateColumn(name.to_string()));
                }
                DegeneratePolicy::Identity => {
                    warn!(column = %name, "Zero-variance column left unscaled");
                }
            }
        }

        Ok(ColumnParams {
            name: name.to_string(),
            mean,
            scale: if degenerate { 1.0 } else { std },
            degenerate,
        })
    }
}

impl Transform for StandardScaler {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let params = column_names(df)
            .iter()
            .map(|name| {
                let values = column_values(df, name)?;
                self.compute_params(name, &values)
            })
            .collect::<Result<Vec<_>>>()?;

        self.params = params;
        self.is_fitted = true;
        Ok(())
    }

    /// Builds all replacement columns first, then applies them in one pass.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .map(|p| {
                let values = column_values(df, &p.name)?;
                let scaled: Vec<f64> = values.iter().map(|v| (v - p.mean) / p.scale).collect();
                Ok(Series::new(p.name.as_str().into(), scaled))
            })
            .collect::<Result<_>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn test_standard_scaler() {
        let df = df!("a" => &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let mut scaler = StandardScaler::default();
        let result = scaler.fit_transform(&df).unwrap();

        let (mean, std) = mean_std(&column_values(&result, "a").unwrap());
        assert!(mean.abs() < 1e-10);
        assert!((std - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_transform_uses_fit_parameters() {
        let train = df!("a" => &[0.0, 2.0]).unwrap();
        let test = df!("a" => &[4.0]).unwrap();

        let mut scaler = StandardScaler::default();
        scaler.fit(&train).unwrap();
        let out = scaler.transform(&test).unwrap();

        // mean 1, std 1 from the training data
        assert_eq!(column_values(&out, "a").unwrap(), vec![3.0]);
    }

    #[test]
    fn test_constant_column_identity_policy() {
        let df = df!("c" => &[7.0, 7.0, 7.0], "a" => &[1.0, 2.0, 3.0]).unwrap();

        let mut scaler = StandardScaler::new(DegeneratePolicy::Identity);
        let out = scaler.fit_transform(&df).unwrap();

        assert_eq!(scaler.degenerate_columns(), vec!["c"]);
        assert_eq!(column_values(&out, "c").unwrap(), vec![0.0, 0.0, 0.0]);
        assert!(column_values(&out, "c").unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_constant_column_error_policy() {
        let df = df!("c" => &[7.0, 7.0, 7.0]).unwrap();
        let mut scaler = StandardScaler::new(DegeneratePolicy::Error);
        let err = scaler.fit(&df).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateColumn(ref c) if c == "c"));
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        let scaler = StandardScaler::default();
        assert!(matches!(scaler.transform(&df), Err(PipelineError::ModelNotFitted)));
    }

    #[test]
    fn test_transform_missing_fitted_column() {
        let train = df!("a" => &[1.0, 2.0], "b" => &[3.0, 4.0]).unwrap();
        let test = df!("a" => &[1.0]).unwrap();
        let mut scaler = StandardScaler::default();
        scaler.fit(&train).unwrap();
        assert!(matches!(scaler.transform(&test), Err(PipelineError::MissingColumn(_))));
    }
}
