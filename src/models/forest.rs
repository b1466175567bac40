//! Random forest classifier

use super::tree::{Criterion, DecisionTree};
use super::Model;
use crate::error::{PipelineError, Result};
use crate::selection::ParamValue;
use ndarray::{Array1, Array2, Axis};
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for features drawn per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// `"sqrt"`, `"log2"`, `"all"`, a positive count, or `null` for all
    pub fn from_param(name: &str, value: &ParamValue) -> Result<Self> {
        match value {
            ParamValue::Str(s) if s == "sqrt" => Ok(MaxFeatures::Sqrt),
            ParamValue::Str(s) if s == "log2" => Ok(MaxFeatures::Log2),
            ParamValue::Str(s) if s == "all" => Ok(MaxFeatures::All),
            ParamValue::None => Ok(MaxFeatures::All),
            ParamValue::Int(n) if *n >= 1 => Ok(MaxFeatures::Fixed(*n as usize)),
            other => Err(PipelineError::InvalidParameter {
                name: name.to_string(),
                value: other.to_string(),
                reason: "expected 'sqrt', 'log2', 'all', null or a positive integer".to_string(),
            }),
        }
    }
}

/// Bagged ensemble of CART trees with majority voting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Base seed; tree `i` uses `random_state + i`
    pub random_state: u64,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 42,
            feature_importances: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, &val) in total.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Fraction of trees voting for each class, columns in ascending label order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let votes = self.vote_counts(x)?;
        let n_trees = self.trees.len() as f64;
        Ok(votes.mapv(|v| v as f64 / n_trees))
    }

    fn vote_counts(&self, x: &Array2<f64>) -> Result<Array2<usize>> {
        if self.trees.is_empty() {
            return Err(PipelineError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let mut votes = Array2::zeros((x.nrows(), self.classes.len()));
        for preds in &all_predictions {
            for (i, label) in preds.iter().enumerate() {
                if let Some(k) = self.classes.iter().position(|c| c == label) {
                    votes[[i, k]] += 1;
                }
            }
        }
        Ok(votes)
    }
}

impl Model for RandomForest {
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
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        self.classes = classes;

        let base_seed = self.random_state;
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new()
                    .with_max_depth(self.max_depth)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_max_features(Some(max_features))
                    .with_random_state(rng.next_u64());
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<_>>()?;

        self.trees = trees;
        self.compute_feature_importances();
        debug!(
            trees = self.trees.len(),
            max_features,
            deepest = self.trees.iter().map(DecisionTree::get_depth).max().unwrap_or(0),
            "Random forest fitted"
        );
        Ok(())
    }

    /// Majority vote; ties go to the lower label.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let votes = self.vote_counts(x)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &count) in row.iter().enumerate() {
                    if count > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
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

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 2.0, 0.1],
            [1.5, 1.8, 0.2],
            [1.2, 2.2, 0.1],
            [0.8, 1.9, 0.3],
            [5.0, 8.0, 0.2],
            [6.0, 9.0, 0.1],
            [5.5, 8.5, 0.3],
            [6.2, 8.8, 0.2],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_random_forest_classifier() {
        let (x, y) = blobs();

        let mut rf = RandomForest::new(10).with_max_depth(Some(5)).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.75);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = blobs();
        let query = array![[3.0, 5.0, 0.2], [3.5, 4.0, 0.1]];

        let mut a = RandomForest::new(15).with_random_state(7);
        let mut b = RandomForest::new(15).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_proba(&query).unwrap(), b.predict_proba(&query).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(5);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 3);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_features_strategies() {
        let mut rf = RandomForest::new(1);
        for (strategy, expected) in [
            (MaxFeatures::Sqrt, 6),
            (MaxFeatures::Log2, 5),
            (MaxFeatures::Fixed(40), 30),
            (MaxFeatures::All, 30),
        ] {
            rf.max_features = strategy;
            assert_eq!(rf.compute_max_features(30), expected);
        }
    }

    #[test]
    fn test_entropy_forest_without_bootstrap() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(4).with_max_depth(Some(3));
        rf.bootstrap = false;
        rf.max_features = MaxFeatures::All;
        rf.criterion = Criterion::Entropy;
        rf.fit(&x, &y).unwrap();

        // Identical data and all features: every tree separates the blobs
        assert_eq!(rf.predict(&x).unwrap(), y);
        assert!(rf.trees().iter().all(|t| t.get_depth() <= 3));
    }

    #[test]
    fn test_zero_estimators_rejected() {
        let (x, y) = blobs();
        assert!(RandomForest::new(0).fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::default();
        assert!(matches!(rf.predict(&array![[1.0]]), Err(PipelineError::ModelNotFitted)));
    }
}
