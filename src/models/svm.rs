//! Binary support vector classifier trained with SMO

use super::Model;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Beyond this many rows the eager kernel matrix is refused.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// RBF width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * var(X))`, resolved at fit time
    Scale,
    /// Fixed value
    Value(f64),
}

/// Kernel function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// K(a, b) = a · b
    Linear,
    /// K(a, b) = exp(-gamma * ||a - b||²)
    Rbf { gamma: Gamma },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rbf { gamma: Gamma::Scale }
    }
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        match self {
            Kernel::Linear => "linear",
            Kernel::Rbf { .. } => "rbf",
        }
    }
}

/// Fitted support set
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SupportSet {
    vectors: Array2<f64>,
    /// alpha_i * y_i
    dual_coef: Array1<f64>,
    bias: f64,
    gamma: f64,
}

/// Support vector classifier for two classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    /// Regularization parameter
    pub c: f64,
    /// Kernel
    pub kernel: Kernel,
    /// KKT tolerance
    pub tol: f64,
    /// Maximum sweeps over the training set
    pub max_iter: usize,
    /// Consecutive sweeps without an update before stopping
    pub max_passes: usize,
    /// Seed for second-multiplier selection
    pub random_state: u64,
    classes: Vec<f64>,
    support: Option<SupportSet>,
}

impl Default for SvmClassifier {
    fn default() -> Self {
        Self::new(1.0, Kernel::default())
    }
}

impl SvmClassifier {
    /// Create a new classifier
    pub fn new(c: f64, kernel: Kernel) -> Self {
        Self {
            c,
            kernel,
            tol: 1e-3,
            max_iter: 200,
            max_passes: 5,
            random_state: 42,
            classes: Vec::new(),
            support: None,
        }
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Set maximum sweeps
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Number of support vectors after fit
    pub fn n_support(&self) -> usize {
        self.support.as_ref().map_or(0, |s| s.vectors.nrows())
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        match self.kernel {
            Kernel::Linear => 0.0,
            Kernel::Rbf { gamma: Gamma::Value(g) } => g,
            Kernel::Rbf { gamma: Gamma::Scale } => {
                let var = x.var(0.0);
                if var > 0.0 {
                    1.0 / (x.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
        }
    }

    fn kernel_value(&self, gamma: f64, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.kernel {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { .. } => {
                let sq: f64 = a.iter().zip(b.iter()).map(|(p, q)| (p - q).powi(2)).sum();
                (-gamma * sq).exp()
            }
        }
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>, gamma: f64) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| self.kernel_value(gamma, x.row(i), x.row(j)))
                    .collect()
            })
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, val) in row.into_iter().enumerate() {
                k[[i, j]] = val;
            }
        }
        k
    }

    /// Simplified SMO with a cached error vector `f(x_k) - y_k`.
    fn smo_train(&self, k: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n = y.len();
        let c = self.c;
        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;
        let mut errors: Array1<f64> = -y;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.random_state);

        let mut passes = 0;
        let mut total_iter = 0;

        while passes < self.max_passes && total_iter < self.max_iter && n > 1 {
            let mut num_changed = 0;

            for i in 0..n {
                let e_i = errors[i];
                if !((y[i] * e_i < -self.tol && alphas[i] < c) || (y[i] * e_i > self.tol && alphas[i] > 0.0)) {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                let e_j = errors[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (l, h) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };
                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j = (alpha_j_old - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alpha_j - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j);

                let d_i = y[i] * (alpha_i - alpha_i_old);
                let d_j = y[j] * (alpha_j - alpha_j_old);

                let b1 = bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
                let b2 = bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
                let new_bias = if alpha_i > 0.0 && alpha_i < c {
                    b1
                } else if alpha_j > 0.0 && alpha_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                let d_b = new_bias - bias;
                for m in 0..n {
                    errors[m] += d_i * k[[i, m]] + d_j * k[[j, m]] + d_b;
                }

                alphas[i] = alpha_i;
                alphas[j] = alpha_j;
                bias = new_bias;
                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (alphas, bias)
    }

    /// Signed distance to the separating surface; positive means the higher label.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let support = self.support.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if support.vectors.nrows() > 0 && x.ncols() != support.vectors.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", support.vectors.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                support
                    .vectors
                    .rows()
                    .into_iter()
                    .zip(support.dual_coef.iter())
                    .map(|(sv, &coef)| coef * self.kernel_value(support.gamma, sv, row))
                    .sum::<f64>()
                    + support.bias
            })
            .collect())
    }
}

impl Model for SvmClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(PipelineError::TrainingError(format!(
                "{} samples exceeds the kernel matrix limit of {}",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }
        if !(self.c > 0.0) {
            return Err(PipelineError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let mut classes: Vec<f64> = y.iter().copied().collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        if classes.len() != 2 {
            return Err(PipelineError::TrainingError(format!(
                "SVM needs exactly 2 classes, found {}",
                classes.len()
            )));
        }

        let y_signed: Array1<f64> = y.mapv(|v| if v == classes[1] { 1.0 } else { -1.0 });
        let gamma = self.resolve_gamma(x);
        let k = self.compute_kernel_matrix(x, gamma);
        let (alphas, bias) = self.smo_train(&k, &y_signed);

        let support_indices: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        let mut vectors = Array2::zeros((support_indices.len(), x.ncols()));
        let mut dual_coef = Array1::zeros(support_indices.len());
        for (row, &idx) in support_indices.iter().enumerate() {
            vectors.row_mut(row).assign(&x.row(idx));
            dual_coef[row] = alphas[idx] * y_signed[idx];
        }

        self.classes = classes;
        self.support = Some(SupportSet {
            vectors,
            dual_coef,
            bias,
            gamma,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        let (neg, pos) = (self.classes[0], self.classes[1]);
        Ok(scores.mapv(|s| if s > 0.0 { pos } else { neg }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [-2.0, -1.5],
            [-1.5, -2.0],
            [-1.0, -1.8],
            [-2.2, -0.9],
            [2.0, 1.5],
            [1.5, 2.0],
            [1.0, 1.8],
            [2.2, 0.9],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_linear_kernel_separates() {
        let (x, y) = separable();
        let mut svm = SvmClassifier::new(1.0, Kernel::Linear);
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);
        assert!(svm.n_support() > 0);
    }

    #[test]
    fn test_rbf_kernel_separates() {
        let (x, y) = separable();
        let mut svm = SvmClassifier::new(10.0, Kernel::Rbf { gamma: Gamma::Scale });
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_gamma_scale() {
        let x = array![[0.0, 2.0], [2.0, 0.0]];
        let svm = SvmClassifier::new(1.0, Kernel::default());
        // variance of {0, 2, 2, 0} is 1
        assert!((svm.resolve_gamma(&x) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];
        assert!(SvmClassifier::default().fit(&x, &y).is_err());
    }

    #[test]
    fn test_nonpositive_c_rejected() {
        let (x, y) = separable();
        let err = SvmClassifier::new(0.0, Kernel::Linear).fit(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }
}
