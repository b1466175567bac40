//! Error types for the diagnosis pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the diagnosis pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Dataset unavailable at {path}: {reason}")]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column '{0}' has zero variance")]
    DegenerateColumn(String),

    #[error("Search grid is empty: no configuration to select")]
    SearchExhaustion,

    #[error("Failed to write artifact {path}: {source}")]
    ArtifactWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
