//! Stratified k-fold cross-validation

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single train/validation split
#[derive(Debug, Clone, PartialEq)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter that keeps class proportions in every fold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub random_state: u64,
}

impl Default for StratifiedKFold {
    fn default() -> Self {
        Self::new(5)
    }
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: 42,
        }
    }

    /// Shuffle within each class before dealing samples out
    pub fn with_shuffle(mut self, shuffle: bool, seed: u64) -> Self {
        self.shuffle = shuffle;
        self.random_state = seed;
        self
    }

    /// Generate `n_splits` splits of `0..y.len()`.
    ///
    /// Samples of each class are dealt round-robin over the folds, with the
    /// fold cursor carried from one class to the next so fold sizes differ by
    /// at most one. Indices inside every split are ascending.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CvSplit>> {
        let n_splits = self.n_splits;
        if n_splits < 2 {
            return Err(PipelineError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }

        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if let Some((class, members)) = class_indices.iter().find(|(_, m)| m.len() < n_splits) {
            return Err(PipelineError::ValidationError(format!(
                "class {} has {} members, fewer than {} folds",
                class,
                members.len(),
                n_splits
            )));
        }

        if self.shuffle {
            let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut cursor = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                folds[cursor % n_splits].push(idx);
                cursor += 1;
            }
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }

        Ok((0..n_splits)
            .map(|fold_idx| {
                let mut train_indices: Vec<usize> = folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect();
                train_indices.sort_unstable();
                CvSplit {
                    train_indices,
                    test_indices: folds[fold_idx].clone(),
                    fold_idx,
                }
            })
            .collect())
    }
}
