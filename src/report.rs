//! Plain-text renderers for the workflow's human-readable output
//!
//! Every function returns a `String`; colouring is left to the CLI.

use crate::evaluation::{ClassificationReport, ConfusionMatrix};
use crate::exploration::{ExplorationReport, FeatureSummary};
use crate::selection::{CandidateResult, SearchSummary};
use std::fmt::Write;

const BAR_WIDTH: usize = 40;
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

fn bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    "█".repeat(filled)
}

/// Horizontal bar per class, scaled to the largest class
pub fn render_class_distribution(report: &ExplorationReport) -> String {
    let mut out = String::new();
    let max = report.class_counts.iter().map(|c| c.count).max().unwrap_or(1).max(1);
    let width = report
        .class_counts
        .iter()
        .map(|c| report.label_name(c.label).len())
        .max()
        .unwrap_or(0);

    for class in &report.class_counts {
        let _ = writeln!(
            out,
            "{:<width$}  {:<bar_width$}  {:>5} ({:>5.1}%)",
            report.label_name(class.label),
            bar(class.count as f64 / max as f64, BAR_WIDTH),
            class.count,
            class.fraction * 100.0,
            width = width,
            bar_width = BAR_WIDTH
        );
    }
    out
}

/// The `top` highest-MI features as a ranked bar chart
pub fn render_mutual_information(report: &ExplorationReport, top: usize) -> String {
    let mut out = String::new();
    let scores = report.top_features(top);
    let max = scores.first().map(|s| s.score).unwrap_or(0.0);
    let width = scores.iter().map(|s| s.feature.len()).max().unwrap_or(0);

    for (rank, score) in scores.iter().enumerate() {
        let fraction = if max > 0.0 { score.score / max } else { 0.0 };
        let _ = writeln!(
            out,
            "{:>2}. {:<width$}  {:<bar_width$}  {:.4}",
            rank + 1,
            score.feature,
            bar(fraction, BAR_WIDTH),
            score.score,
            width = width,
            bar_width = BAR_WIDTH
        );
    }
    out
}

/// count / mean / std / min / quartiles / max table
pub fn render_summary_table(summaries: &[FeatureSummary]) -> String {
    let mut out = String::new();
    let width = summaries.iter().map(|s| s.name.len()).max().unwrap_or(7).max(7);

    let _ = writeln!(
        out,
        "{:<width$} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "feature", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
        width = width
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<width$} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.name, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max,
            width = width
        );
    }
    out
}

/// Full explore-stage output
pub fn render_exploration(report: &ExplorationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} samples, {} features\n",
        report.n_samples, report.n_features
    );
    let _ = writeln!(out, "Class distribution");
    out.push_str(&render_class_distribution(report));
    let _ = writeln!(out, "\nMutual information (top 10)");
    out.push_str(&render_mutual_information(report, 10));
    let _ = writeln!(out, "\nDescriptive statistics");
    out.push_str(&render_summary_table(&report.summaries));
    out
}

/// Candidates ordered by rank, with fold statistics
pub fn render_search(summary: &SearchSummary) -> String {
    let mut out = String::new();
    let rows: Vec<(String, &CandidateResult)> = summary
        .leaderboard()
        .into_iter()
        .map(|r| (r.candidate.to_string(), r))
        .collect();
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(9).max(9);

    let _ = writeln!(
        out,
        "{:>4}  {:<width$}  {:>8}  {:>8}  {:>9}",
        "rank", "candidate", "mean", "std", "fit (s)",
        width = width
    );
    for (name, result) in &rows {
        let _ = writeln!(
            out,
            "{:>4}  {:<width$}  {:>8.4}  {:>8.4}  {:>9.3}",
            result.rank, name, result.mean_score, result.std_score, result.mean_fit_secs,
            width = width
        );
    }

    let best = summary.best();
    let _ = writeln!(
        out,
        "\nBest: {} with mean {} {:.4} over {} folds",
        best.candidate, summary.scoring, best.mean_score, summary.n_splits
    );
    out
}

/// Confusion matrix as a shaded grid, darker for larger shares of each row
pub fn render_confusion(matrix: &ConfusionMatrix, names: &[String]) -> String {
    let mut out = String::new();
    let labels: Vec<String> = matrix
        .labels()
        .iter()
        .map(|&l| {
            (l >= 0.0 && l.fract() == 0.0)
                .then(|| names.get(l as usize).cloned())
                .flatten()
                .unwrap_or_else(|| l.to_string())
        })
        .collect();
    let width = labels.iter().map(String::len).max().unwrap_or(6).max(6);

    let _ = write!(out, "{:>width$} ", "actual", width = width);
    for label in &labels {
        let _ = write!(out, " {:>width$}", label, width = width + 2);
    }
    out.push('\n');

    for (row, label) in matrix.counts().iter().zip(&labels) {
        let total: usize = row.iter().sum();
        let _ = write!(out, "{:>width$} ", label, width = width);
        for &count in row {
            let share = if total > 0 { count as f64 / total as f64 } else { 0.0 };
            let shade = SHADES[((share * (SHADES.len() - 1) as f64).round() as usize).min(SHADES.len() - 1)];
            let _ = write!(out, " {}{:>width$}", shade, count, width = width + 1);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{:>width$}  (columns: predicted)", "", width = width);
    out
}

/// Classification report followed by its confusion matrix
pub fn render_evaluation(report: &ClassificationReport, names: &[String]) -> String {
    format!("{}\n{}", report, render_confusion(&report.confusion, names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploration::{ClassCount, MiScore};
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["malignant".to_string(), "benign".to_string()]
    }

    fn exploration() -> ExplorationReport {
        ExplorationReport {
            n_samples: 4,
            n_features: 2,
            target_names: names(),
            class_counts: vec![
                ClassCount { label: 0.0, count: 1, fraction: 0.25 },
                ClassCount { label: 1.0, count: 3, fraction: 0.75 },
            ],
            summaries: Vec::new(),
            mutual_information: vec![
                MiScore { feature: "worst area".to_string(), score: 0.5 },
                MiScore { feature: "mean texture".to_string(), score: 0.25 },
            ],
        }
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar(0.5, 10).chars().count(), 5);
        assert_eq!(bar(2.0, 10).chars().count(), 10);
    }

    #[test]
    fn test_class_distribution_names_classes() {
        let text = render_class_distribution(&exploration());
        assert!(text.contains("malignant"));
        assert!(text.contains("75.0%"));
    }

    #[test]
    fn test_mi_chart_is_ranked() {
        let text = render_mutual_information(&exploration(), 10);
        let first = text.lines().next().unwrap();
        assert!(first.starts_with(" 1. worst area"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_confusion_render() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let y_pred = array![0.0, 1.0, 1.0, 1.0];
        let matrix = ConfusionMatrix::compute(&y_true, &y_pred);
        let text = render_confusion(&matrix, &names());
        assert!(text.contains("benign"));
        assert!(text.contains("predicted"));
        assert_eq!(text.lines().count(), 4);
    }
}
