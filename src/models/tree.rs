//! CART classification tree

use super::Model;
use crate::error::{PipelineError, Result};
use crate::selection::ParamValue;
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with predicted label
    Leaf { value: f64, n_samples: usize },
    /// Internal node: samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Criterion {
    /// Gini impurity
    #[default]
    Gini,
    /// Shannon entropy
    Entropy,
}

impl Criterion {
    /// `"gini"` or `"entropy"`
    pub fn from_param(name: &str, value: &ParamValue) -> Result<Self> {
        match value.as_str(name)? {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(PipelineError::InvalidParameter {
                name: name.to_string(),
                value: other.to_string(),
                reason: "expected 'gini' or 'entropy'".to_string(),
            }),
        }
    }

    fn impurity(&self, counts: &[usize], n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            Criterion::Gini => {
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
        }
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split (None = all)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: u64,
    n_features: usize,
    classes: Vec<f64>,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-fit state threaded through the recursive build
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    importances: Vec<f64>,
    rng: ChaCha8Rng,
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 0,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set seed for feature sampling
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Labels seen during fit, ascending
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn build_tree(&self, ctx: &mut BuildContext<'_>, indices: &mut [usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let counts = class_counts(ctx.y, indices, ctx.n_classes);
        let impurity = self.criterion.impurity(&counts, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || counts.iter().filter(|&&c| c > 0).count() <= 1;

        if should_stop {
            return self.leaf(&counts, n_samples);
        }

        let Some((feature_idx, threshold, gain)) = self.find_best_split(ctx, indices, impurity) else {
            return self.leaf(&counts, n_samples);
        };

        let x = ctx.x;
        indices.sort_by_key(|&i| !(x[[i, feature_idx]] <= threshold));
        let n_left = indices
            .iter()
            .take_while(|&&i| x[[i, feature_idx]] <= threshold)
            .count();

        if n_left < self.min_samples_leaf || n_samples - n_left < self.min_samples_leaf {
            return self.leaf(&counts, n_samples);
        }

        ctx.importances[feature_idx] += n_samples as f64 * gain;

        let (left_idx, right_idx) = indices.split_at_mut(n_left);
        let left = Box::new(self.build_tree(ctx, left_idx, depth + 1));
        let right = Box::new(self.build_tree(ctx, right_idx, depth + 1));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    fn leaf(&self, counts: &[usize], n_samples: usize) -> TreeNode {
        // Majority class, ties to the lowest label
        let mut best = 0;
        for (k, &c) in counts.iter().enumerate() {
            if c > counts[best] {
                best = k;
            }
        }
        TreeNode::Leaf {
            value: self.classes.get(best).copied().unwrap_or(0.0),
            n_samples,
        }
    }

    /// Best (feature, threshold, impurity decrease) over a random feature
    /// subset, found with one sorted sweep per feature.
    fn find_best_split(
        &self,
        ctx: &mut BuildContext<'_>,
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n_features = ctx.x.ncols();
        let n_try = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let features: Vec<usize> = if n_try < n_features {
            let mut picked = sample(&mut ctx.rng, n_features, n_try).into_vec();
            picked.sort_unstable();
            picked
        } else {
            (0..n_features).collect()
        };

        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature_idx in features {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (ctx.x[[i, feature_idx]], ctx.y[i])));
            sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let mut left = vec![0usize; ctx.n_classes];
            let mut right = vec![0usize; ctx.n_classes];
            for &(_, class) in &sorted {
                right[class] += 1;
            }

            for pos in 0..n - 1 {
                let (value, class) = sorted[pos];
                left[class] += 1;
                right[class] -= 1;

                let next = sorted[pos + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * self.criterion.impurity(&left, n_left)
                    + n_right as f64 * self.criterion.impurity(&right, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, value + (next - value) / 2.0, gain));
                }
            }
        }

        best
    }

    fn predict_sample(node: &TreeNode, x: &Array2<f64>, row: usize) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if x[[row, *feature_idx]] <= *threshold {
                    Self::predict_sample(left, x, row)
                } else {
                    Self::predict_sample(right, x, row)
                }
            }
        }
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

fn class_counts(y: &[usize], indices: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &i in indices {
        counts[y[i]] += 1;
    }
    counts
}

impl Model for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::TrainingError("no training samples".to_string()));
        }

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();

        let y_idx: Vec<usize> = y
            .iter()
            .map(|v| classes.iter().position(|c| c == v).unwrap_or(0))
            .collect();

        self.n_features = n_features;
        self.classes = classes;

        let mut ctx = BuildContext {
            x,
            y: &y_idx,
            n_classes: self.classes.len(),
            importances: vec![0.0; n_features],
            rng: ChaCha8Rng::seed_from_u64(self.random_state),
        };
        let mut indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(&mut ctx, &mut indices, 0);

        let mut importances = ctx.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((0..x.nrows())
            .map(|row| Self::predict_sample(root, x, row))
            .collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data_is_fit_exactly() {
        let x = array![[0.0, 5.0], [1.0, 3.0], [2.0, 4.0], [3.0, 1.0], [4.0, 2.0], [5.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_gini_and_entropy() {
        assert_eq!(Criterion::Gini.impurity(&[5, 0], 5), 0.0);
        assert!((Criterion::Gini.impurity(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert!((Criterion::Entropy.impurity(&[2, 2], 4) - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_feature_count() {
        let mut tree = DecisionTree::new();
        tree.fit(&array![[0.0], [1.0]], &array![0.0, 1.0]).unwrap();
        assert!(tree.predict(&array![[0.0, 1.0]]).is_err());
    }
}
