//! Read-only diagnostics over a loaded dataset
//!
//! Nothing computed here feeds the later stages; it is surfaced to the user
//! and then discarded.

pub mod mutual_info;

pub use mutual_info::{mutual_information, MiConfig, MiEstimator, MiScore};

use crate::data::{column_names, column_values, Dataset};
use crate::error::Result;
use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of samples carrying one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub label: f64,
    pub count: usize,
    pub fraction: f64,
}

/// Per-label counts in ascending label order
pub fn class_counts(target: &Array1<f64>) -> Vec<ClassCount> {
    let mut labels: Vec<f64> = target.iter().copied().collect();
    labels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    labels.dedup();

    let total = target.len().max(1) as f64;
    labels
        .into_iter()
        .map(|label| {
            let count = target.iter().filter(|&&v| v == label).count();
            ClassCount {
                label,
                count,
                fraction: count as f64 / total,
            }
        })
        .collect()
}

/// Descriptive statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// count / mean / std / min / quartiles / max for every column
pub fn describe(df: &DataFrame) -> Result<Vec<FeatureSummary>> {
    column_names(df)
        .into_iter()
        .map(|name| {
            let mut values = column_values(df, &name)?;
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let n = values.len();
            let mean = values.iter().sum::<f64>() / n.max(1) as f64;
            let std = if n > 1 {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
            } else {
                0.0
            };

            Ok(FeatureSummary {
                count: n,
                mean,
                std,
                min: values.first().copied().unwrap_or(f64::NAN),
                q25: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q75: quantile(&values, 0.75),
                max: values.last().copied().unwrap_or(f64::NAN),
                name,
            })
        })
        .collect()
}

/// Everything the explore stage reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationReport {
    pub n_samples: usize,
    pub n_features: usize,
    pub target_names: Vec<String>,
    pub class_counts: Vec<ClassCount>,
    pub summaries: Vec<FeatureSummary>,
    pub mutual_information: Vec<MiScore>,
}

impl ExplorationReport {
    /// Display name for a label
    pub fn label_name(&self, label: f64) -> String {
        if label >= 0.0 && label.fract() == 0.0 {
            if let Some(name) = self.target_names.get(label as usize) {
                return name.clone();
            }
        }
        format!("{}", label)
    }

    /// The `n` highest-MI features
    pub fn top_features(&self, n: usize) -> &[MiScore] {
        &self.mutual_information[..n.min(self.mutual_information.len())]
    }
}

/// Run every diagnostic over `dataset`
pub fn explore(dataset: &Dataset, mi: &MiConfig, target_names: &[String]) -> Result<ExplorationReport> {
    let class_counts = class_counts(dataset.target());
    let summaries = describe(dataset.features())?;
    let mutual_information = mutual_information(dataset.features(), dataset.target(), mi)?;

    if let Some(top) = mutual_information.first() {
        info!(
            samples = dataset.n_samples(),
            features = dataset.n_features(),
            top_feature = %top.feature,
            top_score = top.score,
            "Exploration complete"
        );
    }

    Ok(ExplorationReport {
        n_samples: dataset.n_samples(),
        n_features: dataset.n_features(),
        target_names: target_names.to_vec(),
        class_counts,
        summaries,
        mutual_information,
    })
}
