//! Diagnosis pipeline - breast-cancer classification workflow
//!
//! This crate loads a tabular diagnostic dataset, explores it, augments it
//! with a product feature, selects a classifier by stratified k-fold grid
//! search, evaluates the winner on held-out data and writes it to disk.
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Dataset loading, schema checks, train/test split
//! - [`exploration`] - Class balance, descriptive statistics, mutual information
//! - [`preprocessing`] - Product feature and standard scaling
//!
//! ## Modelling
//! - [`models`] - Logistic regression, random forest, support vector classifier
//! - [`pipeline`] - Ordered transforms plus a classifier, fitted as one unit
//! - [`selection`] - Parameter grids, stratified k-fold, grid search
//! - [`evaluation`] - Accuracy, per-class precision / recall / F1, confusion matrix
//!
//! ## Workflow
//! - [`config`] - JSON-backed settings for every stage
//! - [`workflow`] - Stage orchestration
//! - [`export`] - Artifact serialization
//! - [`report`] - Plain-text rendering of stage results
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod data;
pub mod exploration;
pub mod preprocessing;

// Modelling
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod selection;

// Workflow
pub mod config;
pub mod export;
pub mod report;
pub mod workflow;

// Services
pub mod cli;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result};

    // Data
    pub use crate::data::{train_test_split, DataLoader, Dataset, Split};
    pub use crate::exploration::{explore, ExplorationReport, MiConfig, MiEstimator};
    pub use crate::preprocessing::{DegeneratePolicy, FeatureAugmenter, StandardScaler, Transform};

    // Modelling
    pub use crate::evaluation::{ClassificationReport, ConfusionMatrix};
    pub use crate::models::{Estimator, Kernel, LogisticRegression, Model, RandomForest, SvmClassifier};
    pub use crate::pipeline::Pipeline;
    pub use crate::selection::{default_grid, GridSearch, ModelFamily, ParamGrid, ParamValue, Scoring, StratifiedKFold};

    // Workflow
    pub use crate::config::WorkflowConfig;
    pub use crate::export::{load_pipeline, save_pipeline, ModelMetadata, SerializationFormat};
    pub use crate::workflow::{Workflow, WorkflowOutcome};
}
