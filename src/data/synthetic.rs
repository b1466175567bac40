//! Synthetic breast-cancer-like data
//!
//! Draws each of the 30 features from a class-conditional normal
//! distribution whose mean and spread follow the published per-class summary
//! of the diagnostic dataset. Used for tests, benchmarks and dry runs when the
//! real CSV is not available.

use super::schema::BREAST_CANCER_FEATURES;
use super::Dataset;
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use polars::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// (malignant mean, malignant std, benign mean, benign std), in schema order
const CLASS_PROFILES: [(f64, f64, f64, f64); 30] = [
    (17.46, 3.20, 12.15, 1.78),
    (21.60, 3.78, 17.91, 3.99),
    (115.4, 21.9, 78.08, 11.8),
    (978.0, 368.0, 463.0, 134.0),
    (0.1029, 0.0126, 0.0925, 0.0134),
    (0.145, 0.054, 0.080, 0.034),
    (0.161, 0.075, 0.046, 0.044),
    (0.088, 0.034, 0.026, 0.016),
    (0.193, 0.028, 0.174, 0.025),
    (0.0627, 0.0076, 0.0629, 0.0067),
    (0.609, 0.345, 0.284, 0.113),
    (1.21, 0.48, 1.22, 0.59),
    (4.32, 2.57, 2.00, 0.77),
    (72.7, 61.4, 21.1, 8.8),
    (0.0068, 0.0029, 0.0072, 0.0030),
    (0.0323, 0.0185, 0.0214, 0.0163),
    (0.0418, 0.0216, 0.0260, 0.0329),
    (0.0151, 0.0055, 0.0099, 0.0057),
    (0.0205, 0.0100, 0.0206, 0.0070),
    (0.0041, 0.0021, 0.0036, 0.0029),
    (21.13, 4.28, 13.38, 1.98),
    (29.32, 5.43, 23.52, 5.49),
    (141.4, 29.5, 87.0, 13.5),
    (1422.0, 598.0, 559.0, 164.0),
    (0.1448, 0.0219, 0.1250, 0.0200),
    (0.375, 0.170, 0.183, 0.092),
    (0.451, 0.182, 0.166, 0.140),
    (0.182, 0.046, 0.074, 0.036),
    (0.323, 0.074, 0.270, 0.042),
    (0.0915, 0.0216, 0.0794, 0.0139),
];

/// Generate `n_malignant` rows labelled 0 followed by `n_benign` rows
/// labelled 1. Values are non-negative, as in the real measurements.
pub fn breast_cancer_like(n_malignant: usize, n_benign: usize, seed: u64) -> Result<Dataset> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = n_malignant + n_benign;

    let mut profiles = Vec::with_capacity(CLASS_PROFILES.len());
    for (name, &(m_mean, m_std, b_mean, b_std)) in BREAST_CANCER_FEATURES.iter().zip(CLASS_PROFILES.iter()) {
        let normal = |mean: f64, std: f64| {
            Normal::new(mean, std)
                .map_err(|e| PipelineError::DataError(format!("bad profile for '{}': {}", name, e)))
        };
        profiles.push((normal(m_mean, m_std)?, normal(b_mean, b_std)?));
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(n); BREAST_CANCER_FEATURES.len()];
    let mut target = Vec::with_capacity(n);

    for row in 0..n {
        let malignant = row < n_malignant;
        for (values, (malignant_dist, benign_dist)) in columns.iter_mut().zip(&profiles) {
            let dist = if malignant { malignant_dist } else { benign_dist };
            values.push(dist.sample(&mut rng).abs());
        }
        target.push(if malignant { 0.0 } else { 1.0 });
    }

    let columns: Vec<Column> = BREAST_CANCER_FEATURES
        .iter()
        .zip(columns)
        .map(|(name, values)| Column::new((*name).into(), values))
        .collect();

    Dataset::new(DataFrame::new(columns)?, Array1::from_vec(target), "target")
}

/// Same class sizes as the real dataset: 212 malignant, 357 benign
pub fn breast_cancer_like_default(seed: u64) -> Result<Dataset> {
    breast_cancer_like(212, 357, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_matches_real_dataset() {
        let ds = breast_cancer_like_default(42).unwrap();
        assert_eq!(ds.n_samples(), 569);
        assert_eq!(ds.n_features(), 30);
        assert!(ds.validate_schema(&BREAST_CANCER_FEATURES).is_ok());
        assert_eq!(ds.target().iter().filter(|&&v| v == 0.0).count(), 212);
    }

    #[test]
    fn test_classes_are_separated() {
        let ds = breast_cancer_like(200, 200, 11).unwrap();
        let radius = crate::data::column_values(ds.features(), "mean radius").unwrap();
        let mean = |rows: std::ops::Range<usize>| {
            let len = rows.len() as f64;
            rows.map(|i| radius[i]).sum::<f64>() / len
        };
        // Profile means are 17.46 (malignant) and 12.15 (benign)
        assert!((mean(0..200) - 17.46).abs() < 1.0);
        assert!((mean(200..400) - 12.15).abs() < 1.0);
        assert!(radius.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_generation_is_seeded() {
        let a = breast_cancer_like(5, 5, 3).unwrap();
        let b = breast_cancer_like(5, 5, 3).unwrap();
        assert!(a.features().equals(b.features()));
    }
}
