//! CSV loading for the diagnosis dataset

use super::schema::{BENIGN_CODE, MALIGNANT_CODE};
use super::Dataset;
use crate::config::DataConfig;
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Bundled diagnostic dataset: a headered CSV with an `id` column, the 30
/// feature columns and a 0/1 `target` column (0 = malignant).
pub const BUNDLED_DATASET: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/breast_cancer.csv");

/// Loads the tabular dataset from a CSV file
pub struct DataLoader {
    /// Rows scanned for schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Set number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load and validate the dataset described by `config`
    pub fn load(&self, config: &DataConfig) -> Result<Dataset> {
        let start = Instant::now();
        let df = self.read_csv(&config.path)?;
        let dataset = Self::from_frame(df, config)?;

        info!(
            path = %config.path.display(),
            rows = dataset.n_samples(),
            features = dataset.n_features(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Dataset loaded"
        );
        Ok(dataset)
    }

    /// Load the bundled dataset with the default column layout.
    /// Fails with `DataUnavailable` when the file has not been provisioned.
    pub fn load_bundled(&self) -> Result<Dataset> {
        self.load(&DataConfig::default().with_path(BUNDLED_DATASET))
    }

    /// Read a headered CSV file.
    /// Any failure to open or parse the file is reported as `DataUnavailable`.
    pub fn read_csv(&self, path: &Path) -> Result<DataFrame> {
        let unavailable = |reason: String| PipelineError::DataUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file not found".to_string()));
        }

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(|e| unavailable(e.to_string()))
    }

    /// Split a raw frame into features and label.
    ///
    /// Columns listed in `drop_columns` are removed when present. A numeric
    /// target must already be 0/1; a string target in the raw UCI layout is
    /// mapped `M -> 0`, `B -> 1`.
    pub fn from_frame(mut df: DataFrame, config: &DataConfig) -> Result<Dataset> {
        for name in &config.drop_columns {
            if df.column(name).is_ok() {
                df = df.drop(name)?;
                debug!(column = %name, "Dropped column");
            }
        }

        let target_column = df
            .column(&config.target_column)
            .map_err(|_| PipelineError::MissingColumn(config.target_column.clone()))?;
        let target = Self::parse_target(target_column)?;

        let features = df.drop(&config.target_column)?;
        let columns: Vec<Column> = features
            .get_columns()
            .iter()
            .map(|c| c.cast(&DataType::Float64))
            .collect::<PolarsResult<_>>()?;
        let features = DataFrame::new(columns)?;

        Dataset::new(features, target, config.target_column.clone())
    }

    fn parse_target(column: &Column) -> Result<Array1<f64>> {
        if column.dtype() == &DataType::String {
            let codes = column.as_materialized_series().str()?;
            return codes
                .into_iter()
                .enumerate()
                .map(|(row, code)| match code.map(str::trim) {
                    Some(MALIGNANT_CODE) => Ok(0.0),
                    Some(BENIGN_CODE) => Ok(1.0),
                    other => Err(PipelineError::DataError(format!(
                        "unrecognised diagnosis {:?} at row {}",
                        other, row
                    ))),
                })
                .collect();
        }

        let column = column.cast(&DataType::Float64)?;
        column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| PipelineError::DataError(format!("missing label at row {}", row)))
            })
            .collect()
    }
}

/// Save a frame as CSV
pub struct DataSaver;

impl DataSaver {
    /// Write `df` to `path` with a header row
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path).map_err(|e| PipelineError::ArtifactWriteFailure {
            path: path.to_path_buf(),
            source: e,
        })?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        Ok(())
    }
}
