//! Deterministic train/test split

use super::Dataset;
use crate::error::{PipelineError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Disjoint train/test partition of a dataset
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
    /// Source rows of `train`, ascending
    pub train_indices: Vec<usize>,
    /// Source rows of `test`, ascending
    pub test_indices: Vec<usize>,
}

/// Split `dataset` into train and test sets.
///
/// `test_size` is the fraction of rows held out. With `stratify`, each class
/// contributes `round(test_size * class_count)` rows to the test set, so both
/// sides keep the original class balance. The same inputs always yield the
/// same row membership.
pub fn train_test_split(
    dataset: &Dataset,
    test_size: f64,
    random_state: u64,
    stratify: bool,
) -> Result<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be in (0, 1)".to_string(),
        });
    }

    let n_samples = dataset.n_samples();
    let mut rng = ChaCha8Rng::seed_from_u64(random_state);

    let (mut train_indices, mut test_indices) = if stratify {
        let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &label) in dataset.target().iter().enumerate() {
            by_class.entry(label.round() as i64).or_default().push(idx);
        }

        let mut train = Vec::with_capacity(n_samples);
        let mut test = Vec::new();
        for indices in by_class.values_mut() {
            indices.shuffle(&mut rng);
            let n_test = (indices.len() as f64 * test_size).round() as usize;
            let n_test = n_test.min(indices.len());
            test.extend_from_slice(&indices[..n_test]);
            train.extend_from_slice(&indices[n_test..]);
        }
        (train, test)
    } else {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        indices.shuffle(&mut rng);
        let n_test = (n_samples as f64 * test_size).ceil() as usize;
        let test = indices[..n_test.min(n_samples)].to_vec();
        let train = indices[n_test.min(n_samples)..].to_vec();
        (train, test)
    };

    if train_indices.is_empty() || test_indices.is_empty() {
        return Err(PipelineError::ValidationError(format!(
            "test_size {} leaves an empty side for {} samples",
            test_size, n_samples
        )));
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(Split {
        train: dataset.select_rows(&train_indices)?,
        test: dataset.select_rows(&test_indices)?,
        train_indices,
        test_indices,
    })
}
