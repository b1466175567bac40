//! Held-out evaluation: per-class metrics and the confusion matrix

pub mod metrics;

pub use metrics::{accuracy, f1, precision, recall, BinaryCounts};

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counts of (actual, predicted) label pairs. Rows are actual labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<f64>,
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Build over the sorted union of labels in both arrays
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut labels: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        labels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        labels.dedup();

        let k = labels.len();
        let mut counts = vec![vec![0usize; k]; k];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let row = labels.iter().position(|l| l == t);
            let col = labels.iter().position(|l| l == p);
            if let (Some(r), Some(c)) = (row, col) {
                counts[r][c] += 1;
            }
        }
        Self { labels, counts }
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Row-major counts, `counts()[actual][predicted]`
    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Count at (`actual`, `predicted`) label positions; `None` out of range
    pub fn get(&self, actual: usize, predicted: usize) -> Option<usize> {
        self.counts.get(actual)?.get(predicted).copied()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }
}

/// Precision, recall and F1 for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: f64,
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Accuracy, per-class metrics, macro and weighted averages, confusion matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub confusion: ConfusionMatrix,
}

impl ClassificationReport {
    /// Score predictions against ground truth.
    ///
    /// `target_names[i]` names label `i`; labels without a name are shown
    /// as numbers. Undefined ratios are reported as 0.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, target_names: &[String]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(PipelineError::ValidationError(
                "cannot evaluate an empty prediction set".to_string(),
            ));
        }

        let confusion = ConfusionMatrix::compute(y_true, y_pred);
        let classes: Vec<ClassMetrics> = confusion
            .labels()
            .iter()
            .map(|&label| {
                let counts = BinaryCounts::compute(y_true, y_pred, label);
                ClassMetrics {
                    label,
                    name: label_name(label, target_names),
                    precision: counts.precision(),
                    recall: counts.recall(),
                    f1: counts.f1(),
                    support: counts.tp + counts.fn_,
                }
            })
            .collect();

        let k = classes.len() as f64;
        let total: usize = classes.iter().map(|c| c.support).sum();
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / k,
            support: total,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Ok(Self {
            accuracy: accuracy(y_true, y_pred),
            classes,
            macro_avg,
            weighted_avg,
            confusion,
        })
    }

    /// Metrics for one label
    pub fn class(&self, label: f64) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

fn label_name(label: f64, target_names: &[String]) -> String {
    if label >= 0.0 && label.fract() == 0.0 {
        if let Some(name) = target_names.get(label as usize) {
            return name.clone();
        }
    }
    format!("{}", label)
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support",
            width = width
        )?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                c.name, c.precision, c.recall, c.f1, c.support,
                width = width
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support,
            width = width
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, avg.precision, avg.recall, avg.f1, avg.support,
                width = width
            )?;
        }
        Ok(())
    }
}
