//! Workflow configuration
//!
//! Every section has working defaults, so a JSON file only needs the fields
//! it changes.

use crate::error::{PipelineError, Result};
use crate::exploration::MiConfig;
use crate::export::SerializationFormat;
use crate::preprocessing::DegeneratePolicy;
use crate::selection::{default_grid, expand_all, ParamGrid, Scoring};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the dataset lives and how to read it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with a header row
    pub path: PathBuf,
    /// Label column
    pub target_column: String,
    /// Columns removed before modelling (e.g. a row id)
    pub drop_columns: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/breast_cancer.csv"),
            target_column: "target".to_string(),
            drop_columns: vec!["id".to_string()],
        }
    }
}

impl DataConfig {
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_target_column(mut self, name: &str) -> Self {
        self.target_column = name.to_string();
        self
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }
}

/// Train/test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    pub random_state: u64,
    /// Keep class proportions on both sides
    pub stratify: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            random_state: 42,
            stratify: true,
        }
    }
}

/// Product feature settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    pub left: String,
    pub right: String,
    pub output: String,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            left: "mean radius".to_string(),
            right: "mean texture".to_string(),
            output: "radius_texture".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub degenerate_policy: DegeneratePolicy,
}

/// Diagnostics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub mutual_information: MiConfig,
    /// `target_names[i]` names label `i`
    pub target_names: Vec<String>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            mutual_information: MiConfig::default(),
            target_names: vec!["malignant".to_string(), "benign".to_string()],
        }
    }
}

/// Grid search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub cv_folds: usize,
    pub scoring: Scoring,
    pub grid: Vec<ParamGrid>,
    /// Shuffle within classes before assigning folds
    pub shuffle: bool,
    /// Seed for fold shuffling and every stochastic classifier
    pub random_state: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv_folds: 5,
            scoring: Scoring::Accuracy,
            grid: default_grid(),
            shuffle: false,
            random_state: 42,
        }
    }
}

impl SearchConfig {
    pub fn with_grid(mut self, grid: Vec<ParamGrid>) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }
}

/// Artifact settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: PathBuf,
    pub format: SerializationFormat,
    /// Name recorded in the artifact metadata
    pub model_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("artifacts/model.bin"),
            format: SerializationFormat::Binary,
            model_name: "breast_cancer_classifier".to_string(),
        }
    }
}

/// Complete workflow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub augment: AugmentConfig,
    pub scaling: ScalingConfig,
    pub exploration: ExplorationConfig,
    pub search: SearchConfig,
    pub export: ExportConfig,
}

impl WorkflowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            PipelineError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })
    }

    pub fn with_data(mut self, data: DataConfig) -> Self {
        self.data = data;
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// Reject settings no stage could run with
    pub fn validate(&self) -> Result<()> {
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "split.test_size".to_string(),
                value: self.split.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.search.cv_folds < 2 {
            return Err(PipelineError::InvalidParameter {
                name: "search.cv_folds".to_string(),
                value: self.search.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        self.exploration.mutual_information.validate()?;
        if self.augment.left.is_empty() || self.augment.right.is_empty() || self.augment.output.is_empty() {
            return Err(PipelineError::ConfigError(
                "augment column names must not be empty".to_string(),
            ));
        }
        if expand_all(&self.search.grid).is_empty() {
            return Err(PipelineError::SearchExhaustion);
        }
        Ok(())
    }
}
