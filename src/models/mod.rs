//! Classifier families
//!
//! Three binary classifiers share the [`Model`] trait. [`Estimator`] is the
//! serializable union a [`Pipeline`](crate::pipeline::Pipeline) carries, and
//! the point where a search [`Candidate`] becomes a concrete model.

pub mod forest;
pub mod linear;
pub mod svm;
pub mod tree;

pub use forest::{MaxFeatures, RandomForest};
pub use linear::LogisticRegression;
pub use svm::{Gamma, Kernel, SvmClassifier};
pub use tree::{Criterion, DecisionTree};

use crate::error::{PipelineError, Result};
use crate::selection::{Candidate, ModelFamily, ParamValue};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Supervised classifier over a dense feature matrix
pub trait Model {
    /// Fit on `x` (rows = samples) and labels `y`
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one label per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Normalised per-feature importances, when the model has them
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// One of the supported classifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForest),
    Svc(SvmClassifier),
}

impl Estimator {
    pub fn family(&self) -> ModelFamily {
        match self {
            Estimator::LogisticRegression(_) => ModelFamily::LogisticRegression,
            Estimator::RandomForest(_) => ModelFamily::RandomForest,
            Estimator::Svc(_) => ModelFamily::Svc,
        }
    }

    /// Build an unfitted model from a search candidate.
    ///
    /// Parameters left out of the candidate keep the model defaults. `seed`
    /// feeds every stochastic part of the model.
    pub fn from_candidate(candidate: &Candidate, seed: u64) -> Result<Self> {
        let estimator = match candidate.family() {
            ModelFamily::LogisticRegression => {
                let mut model = LogisticRegression::default();
                for (name, value) in candidate.params() {
                    match name.as_str() {
                        "C" => model.c = value.as_f64(name)?,
                        "max_iter" => model.max_iter = value.as_usize(name)?,
                        _ => return Err(unknown_param(candidate.family(), name, value)),
                    }
                }
                Estimator::LogisticRegression(model)
            }
            ModelFamily::RandomForest => {
                let mut model = RandomForest::default().with_random_state(seed);
                for (name, value) in candidate.params() {
                    match name.as_str() {
                        "n_estimators" => model.n_estimators = value.as_usize(name)?,
                        "max_depth" => model.max_depth = value.as_optional_usize(name)?,
                        "min_samples_split" => model.min_samples_split = value.as_usize(name)?.max(2),
                        "min_samples_leaf" => model.min_samples_leaf = value.as_usize(name)?.max(1),
                        "max_features" => model.max_features = MaxFeatures::from_param(name, value)?,
                        "criterion" => model.criterion = Criterion::from_param(name, value)?,
                        "bootstrap" => model.bootstrap = value.as_bool(name)?,
                        _ => return Err(unknown_param(candidate.family(), name, value)),
                    }
                }
                Estimator::RandomForest(model)
            }
            ModelFamily::Svc => {
                let mut c = 1.0;
                let mut kernel_name = "rbf".to_string();
                let mut gamma = Gamma::Scale;
                for (name, value) in candidate.params() {
                    match name.as_str() {
                        "C" => c = value.as_f64(name)?,
                        "kernel" => kernel_name = value.as_str(name)?.to_string(),
                        "gamma" => {
                            gamma = match value {
                                ParamValue::Str(s) if s == "scale" => Gamma::Scale,
                                other => Gamma::Value(other.as_f64(name)?),
                            }
                        }
                        _ => return Err(unknown_param(candidate.family(), name, value)),
                    }
                }
                let kernel = match kernel_name.as_str() {
                    "linear" => Kernel::Linear,
                    "rbf" => Kernel::Rbf { gamma },
                    other => {
                        return Err(PipelineError::InvalidParameter {
                            name: "kernel".to_string(),
                            value: other.to_string(),
                            reason: "expected 'linear' or 'rbf'".to_string(),
                        })
                    }
                };
                Estimator::Svc(SvmClassifier::new(c, kernel).with_random_state(seed))
            }
        };
        Ok(estimator)
    }
}

fn unknown_param(family: ModelFamily, name: &str, value: &ParamValue) -> PipelineError {
    PipelineError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("not a parameter of {}", family),
    }
}

impl Model for Estimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Estimator::LogisticRegression(m) => m.fit(x, y),
            Estimator::RandomForest(m) => m.fit(x, y),
            Estimator::Svc(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Estimator::LogisticRegression(m) => m.predict(x),
            Estimator::RandomForest(m) => m.predict(x),
            Estimator::Svc(m) => m.predict(x),
        }
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            Estimator::LogisticRegression(m) => m.feature_importances(),
            Estimator::RandomForest(m) => m.feature_importances(),
            Estimator::Svc(m) => m.feature_importances(),
        }
    }
}
