//! Dataset loading, schema and train/test splitting
//!
//! A [`Dataset`] keeps the feature table as a polars [`DataFrame`] (columns
//! addressed by name, never by position) and the binary label as an
//! `Array1<f64>` holding `0.0` (malignant) or `1.0` (benign).

pub mod loader;
pub mod schema;
pub mod split;
pub mod synthetic;

pub use loader::{DataLoader, DataSaver, BUNDLED_DATASET};
pub use schema::{BREAST_CANCER_FEATURES, DEFAULT_TARGET_NAMES};
pub use split::{train_test_split, Split};

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Feature table plus binary label
#[derive(Debug, Clone)]
pub struct Dataset {
    features: DataFrame,
    target: Array1<f64>,
    target_name: String,
}

impl Dataset {
    /// Build a dataset, checking that every feature is a complete, finite
    /// Float64 column and every label is 0 or 1.
    pub fn new(features: DataFrame, target: Array1<f64>, target_name: impl Into<String>) -> Result<Self> {
        if features.height() != target.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels", features.height()),
                actual: format!("{} labels", target.len()),
            });
        }

        for column in features.get_columns() {
            if column.dtype() != &DataType::Float64 {
                return Err(PipelineError::DataError(format!(
                    "feature '{}' must be Float64, found {}",
                    column.name(),
                    column.dtype()
                )));
            }
            if column.null_count() > 0 {
                return Err(PipelineError::DataError(format!(
                    "feature '{}' has {} missing values",
                    column.name(),
                    column.null_count()
                )));
            }
            if let Some((row, value)) = column
                .f64()?
                .into_no_null_iter()
                .enumerate()
                .find(|(_, v)| !v.is_finite())
            {
                return Err(PipelineError::DataError(format!(
                    "non-finite value {} in column '{}' at row {}",
                    value,
                    column.name(),
                    row
                )));
            }
        }

        if let Some((row, label)) = target
            .iter()
            .enumerate()
            .find(|(_, &v)| v != 0.0 && v != 1.0)
        {
            return Err(PipelineError::DataError(format!(
                "label at row {} is {}, expected 0 or 1",
                row, label
            )));
        }

        Ok(Self {
            features,
            target,
            target_name: target_name.into(),
        })
    }

    /// Feature table (label excluded)
    pub fn features(&self) -> &DataFrame {
        &self.features
    }

    /// Binary labels
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Feature column names in table order
    pub fn feature_names(&self) -> Vec<String> {
        column_names(&self.features)
    }

    pub fn n_samples(&self) -> usize {
        self.features.height()
    }

    pub fn n_features(&self) -> usize {
        self.features.width()
    }

    /// New dataset holding the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        Ok(Self {
            features: take_rows(&self.features, indices)?,
            target: indices.iter().map(|&i| self.target[i]).collect(),
            target_name: self.target_name.clone(),
        })
    }

    /// Check that every expected feature column is present
    pub fn validate_schema(&self, expected: &[&str]) -> Result<()> {
        let present = self.feature_names();
        for name in expected {
            if !present.iter().any(|p| p == name) {
                return Err(PipelineError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Column names of a frame, in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Gather rows of a frame by position
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

/// Read one numeric column as contiguous f64 values
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
    let column = column.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                PipelineError::DataError(format!("missing value in '{}' at row {}", name, row))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(values)
}

/// Extract named columns from a frame into a row-major `Array2<f64>`.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(i, j)| col_data[j][i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_frame() -> DataFrame {
        df!(
            "a" => &[1.0, 2.0, 3.0, 4.0],
            "b" => &[10.0, 20.0, 30.0, 40.0]
        )
        .unwrap()
    }

    #[test]
    fn test_dataset_rejects_non_binary_labels() {
        let err = Dataset::new(small_frame(), array![0.0, 1.0, 2.0, 1.0], "target").unwrap_err();
        assert!(matches!(err, PipelineError::DataError(_)));
    }

    #[test]
    fn test_dataset_rejects_non_finite_features() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let df = df!(
                "a" => &[1.0, 2.0, 3.0, 4.0],
                "b" => &[10.0, 20.0, bad, 40.0]
            )
            .unwrap();
            let err = Dataset::new(df, array![0.0, 1.0, 0.0, 1.0], "target").unwrap_err();
            match err {
                PipelineError::DataError(msg) => {
                    assert!(msg.contains("'b'"), "{}", msg);
                    assert!(msg.contains("row 2"), "{}", msg);
                }
                other => panic!("expected DataError, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_dataset_rejects_length_mismatch() {
        let err = Dataset::new(small_frame(), array![0.0, 1.0], "target").unwrap_err();
        assert!(matches!(err, PipelineError::ShapeError { .. }));
    }

    #[test]
    fn test_select_rows_keeps_labels_aligned() {
        let ds = Dataset::new(small_frame(), array![0.0, 1.0, 0.0, 1.0], "target").unwrap();
        let subset = ds.select_rows(&[3, 0]).unwrap();

        assert_eq!(subset.n_samples(), 2);
        assert_eq!(column_values(subset.features(), "a").unwrap(), vec![4.0, 1.0]);
        assert_eq!(subset.target().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_columns_to_array2_follows_requested_order() {
        let df = small_frame();
        let x = columns_to_array2(&df, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(x.shape(), &[4, 2]);
        assert_eq!(x[[1, 0]], 20.0);
        assert_eq!(x[[1, 1]], 2.0);
    }

    #[test]
    fn test_validate_schema_reports_missing_feature() {
        let ds = Dataset::new(small_frame(), array![0.0, 1.0, 0.0, 1.0], "target").unwrap();
        let err = ds.validate_schema(&["a", "c"]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(ref c) if c == "c"));
    }
}
