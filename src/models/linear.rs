//! L2-regularised logistic regression

use super::Model;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Binary logistic regression fitted by full-batch gradient descent.
///
/// `c` is the inverse regularisation strength: the objective is the mean
/// log-loss plus `||w||^2 / (2 * c * n_samples)`. The intercept is not
/// penalised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new(c: f64) -> Self {
        Self {
            c,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Probability of label 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != coefficients.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        let linear = x.dot(coefficients) + self.intercept;
        Ok(Self::sigmoid(&linear))
    }
}

impl Model for LogisticRegression {
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
        if !(self.c > 0.0) {
            return Err(PipelineError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;
        let alpha = 1.0 / (self.c * n_samples as f64);
        let lr = self.learning_rate;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        let coef = self.coefficients.as_ref()?;
        let abs = coef.mapv(f64::abs);
        let total = abs.sum();
        Some(if total > 0.0 { abs / total } else { abs })
    }
}
