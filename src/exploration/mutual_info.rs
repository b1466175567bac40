//! Mutual information between each feature and the class label

use crate::data::{column_names, column_values};
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::DataFrame;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How MI is estimated for a continuous feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MiEstimator {
    /// k-nearest-neighbour estimator for a continuous feature and discrete label
    NearestNeighbors { n_neighbors: usize },
    /// Plug-in estimate over equal-width bins
    Histogram { bins: usize },
}

impl Default for MiEstimator {
    fn default() -> Self {
        MiEstimator::NearestNeighbors { n_neighbors: 3 }
    }
}

/// Mutual-information settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiConfig {
    pub estimator: MiEstimator,
    /// Seed for the tie-breaking jitter
    pub random_state: u64,
}

impl Default for MiConfig {
    fn default() -> Self {
        Self {
            estimator: MiEstimator::default(),
            random_state: 42,
        }
    }
}

impl MiConfig {
    pub fn with_estimator(mut self, estimator: MiEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.estimator {
            MiEstimator::NearestNeighbors { n_neighbors: 0 } => Err(PipelineError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            }),
            MiEstimator::Histogram { bins } if bins < 2 => Err(PipelineError::InvalidParameter {
                name: "bins".to_string(),
                value: bins.to_string(),
                reason: "must be at least 2".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// MI score of one feature, in nats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiScore {
    pub feature: String,
    pub score: f64,
}

/// Score every column of `features` against `target`.
///
/// Returned in descending score order; equal scores keep column order.
pub fn mutual_information(features: &DataFrame, target: &Array1<f64>, config: &MiConfig) -> Result<Vec<MiScore>> {
    config.validate()?;
    if features.height() != target.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} labels", features.height()),
            actual: format!("{} labels", target.len()),
        });
    }

    let (labels, n_classes) = encode_labels(target);
    let names = column_names(features);
    let mut columns: Vec<Vec<f64>> = names
        .iter()
        .map(|name| column_values(features, name))
        .collect::<Result<_>>()?;

    if let MiEstimator::NearestNeighbors { .. } = config.estimator {
        let mut rng = ChaCha8Rng::seed_from_u64(config.random_state);
        for values in &mut columns {
            standardize_with_jitter(values, &mut rng);
        }
    }

    let scores: Vec<f64> = columns
        .par_iter()
        .map(|values| match config.estimator {
            MiEstimator::NearestNeighbors { n_neighbors } => knn_mi(values, &labels, n_classes, n_neighbors),
            MiEstimator::Histogram { bins } => histogram_mi(values, &labels, n_classes, bins),
        })
        .collect();

    let mut ranked: Vec<MiScore> = names
        .into_iter()
        .zip(scores)
        .map(|(feature, score)| MiScore { feature, score })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(ranked)
}

/// Map labels to dense class indices in ascending label order
fn encode_labels(target: &Array1<f64>) -> (Vec<usize>, usize) {
    let mut classes: Vec<f64> = target.iter().copied().collect();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes.dedup();
    let labels = target
        .iter()
        .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
        .collect();
    (labels, classes.len())
}

/// Divide by the population std, then add `1e-10 * max(1, mean|x|)` Gaussian noise
fn standardize_with_jitter(values: &mut [f64], rng: &mut ChaCha8Rng) {
    let n = values.len() as f64;
    if n == 0.0 {
        return;
    }
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std > 0.0 {
        for v in values.iter_mut() {
            *v /= std;
        }
    }
    let amplitude = 1e-10 * (values.iter().map(|v| v.abs()).sum::<f64>() / n).max(1.0);
    for v in values.iter_mut() {
        *v += amplitude * rng.sample::<f64, _>(StandardNormal);
    }
}

/// Distance from `value` to its k-th nearest neighbour in `sorted`,
/// not counting one copy of `value` itself.
fn kth_neighbor_distance(sorted: &[f64], value: f64, k: usize) -> f64 {
    let pos = sorted.partition_point(|&a| a < value);
    // next left candidate is sorted[left - 1]; next right candidate is sorted[right]
    let (mut left, mut right) = (pos, pos + 1);
    let mut dist = 0.0;
    for _ in 0..k {
        let dl = (left > 0).then(|| value - sorted[left - 1]);
        let dr = (right < sorted.len()).then(|| sorted[right] - value);
        match (dl, dr) {
            (Some(a), Some(b)) if a <= b => {
                dist = a;
                left -= 1;
            }
            (Some(a), None) => {
                dist = a;
                left -= 1;
            }
            (_, Some(b)) => {
                dist = b;
                right += 1;
            }
            (None, None) => break,
        }
    }
    dist
}

fn knn_mi(values: &[f64], labels: &[usize], n_classes: usize, n_neighbors: usize) -> f64 {
    let mut class_count = vec![0usize; n_classes];
    for &l in labels {
        class_count[l] += 1;
    }

    let mut radius = vec![0.0; values.len()];
    let mut k_used = vec![0usize; values.len()];
    for (class, &count) in class_count.iter().enumerate() {
        if count < 2 {
            continue;
        }
        let k = n_neighbors.min(count - 1);
        let members: Vec<usize> = (0..values.len()).filter(|&i| labels[i] == class).collect();
        let mut sorted: Vec<f64> = members.iter().map(|&i| values[i]).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for &i in &members {
            radius[i] = kth_neighbor_distance(&sorted, values[i], k);
            k_used[i] = k;
        }
    }

    let kept: Vec<usize> = (0..values.len()).filter(|&i| class_count[labels[i]] > 1).collect();
    let n = kept.len();
    if n < 2 {
        return 0.0;
    }

    let mut all_sorted: Vec<f64> = kept.iter().map(|&i| values[i]).collect();
    all_sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let (mut psi_k, mut psi_label, mut psi_m) = (0.0, 0.0, 0.0);
    for &i in &kept {
        let (v, r) = (values[i], radius[i]);
        // neighbours strictly inside the radius, the sample itself included
        let lo = all_sorted.partition_point(|&a| a <= v - r);
        let hi = all_sorted.partition_point(|&a| a < v + r);
        let m = hi.saturating_sub(lo).max(1);

        psi_k += digamma(k_used[i] as f64);
        psi_label += digamma(class_count[labels[i]] as f64);
        psi_m += digamma(m as f64);
    }

    let nf = n as f64;
    (digamma(nf) + psi_k / nf - psi_label / nf - psi_m / nf).max(0.0)
}

fn histogram_mi(values: &[f64], labels: &[usize], n_classes: usize, bins: usize) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return 0.0;
    }
    let width = range / bins as f64;

    let mut joint = vec![0usize; bins * n_classes];
    let mut bin_counts = vec![0usize; bins];
    let mut class_counts = vec![0usize; n_classes];
    for (&v, &l) in values.iter().zip(labels) {
        let b = (((v - min) / width) as usize).min(bins - 1);
        joint[b * n_classes + l] += 1;
        bin_counts[b] += 1;
        class_counts[l] += 1;
    }

    let nf = n as f64;
    let mut mi = 0.0;
    for b in 0..bins {
        for c in 0..n_classes {
            let count = joint[b * n_classes + c];
            if count == 0 {
                continue;
            }
            let p_xy = count as f64 / nf;
            let p_x = bin_counts[b] as f64 / nf;
            let p_y = class_counts[c] as f64 / nf;
            mi += p_xy * (p_xy / (p_x * p_y)).ln();
        }
    }
    mi.max(0.0)
}

/// Digamma function for positive arguments
pub(crate) fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn frame() -> (DataFrame, Array1<f64>) {
        let n = 60;
        let signal: Vec<f64> = (0..n).map(|i| if i < 30 { i as f64 * 0.1 } else { 10.0 + i as f64 * 0.1 }).collect();
        let noise: Vec<f64> = (0..n).map(|i| ((i * 37) % 11) as f64).collect();
        let constant = vec![5.0; n];
        let df = df!("noise" => noise, "signal" => signal, "constant" => constant).unwrap();
        let y: Array1<f64> = (0..n).map(|i| if i < 30 { 0.0 } else { 1.0 }).collect();
        (df, y)
    }

    #[test]
    fn test_digamma() {
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        assert!((digamma(10.0) - 2.251_752_589_066_721).abs() < 1e-10);
        assert!((digamma(2.0) - digamma(1.0) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_knn_ranks_signal_first() {
        let (df, y) = frame();
        let scores = mutual_information(&df, &y, &MiConfig::default()).unwrap();

        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].feature, "signal");
        assert!(scores[0].score > 0.5);
        assert!(scores.iter().all(|s| s.score >= 0.0));
        let constant = scores.iter().find(|s| s.feature == "constant").unwrap();
        assert!(constant.score < 0.1);
    }

    #[test]
    fn test_knn_is_deterministic() {
        let (df, y) = frame();
        let a = mutual_information(&df, &y, &MiConfig::default()).unwrap();
        let b = mutual_information(&df, &y, &MiConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_histogram_perfect_split() {
        let df = df!("x" => &[0.0, 0.0, 1.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        let config = MiConfig::default().with_estimator(MiEstimator::Histogram { bins: 2 });

        let scores = mutual_information(&df, &y, &config).unwrap();
        assert!((scores[0].score - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_constant_feature_is_zero() {
        let (df, y) = frame();
        let config = MiConfig::default().with_estimator(MiEstimator::Histogram { bins: 10 });
        let scores = mutual_information(&df, &y, &config).unwrap();
        let constant = scores.iter().find(|s| s.feature == "constant").unwrap();
        assert_eq!(constant.score, 0.0);
        assert_eq!(scores.last().unwrap().feature, "constant");
    }

    #[test]
    fn test_kth_neighbor_distance() {
        let sorted = [0.0, 1.0, 3.0, 6.0];
        assert_eq!(kth_neighbor_distance(&sorted, 1.0, 1), 1.0);
        assert_eq!(kth_neighbor_distance(&sorted, 1.0, 2), 2.0);
        assert_eq!(kth_neighbor_distance(&sorted, 6.0, 1), 3.0);
    }

    #[test]
    fn test_invalid_settings() {
        let (df, y) = frame();
        let config = MiConfig::default().with_estimator(MiEstimator::NearestNeighbors { n_neighbors: 0 });
        assert!(mutual_information(&df, &y, &config).is_err());
        let config = MiConfig::default().with_estimator(MiEstimator::Histogram { bins: 1 });
        assert!(mutual_information(&df, &y, &config).is_err());
    }
}
