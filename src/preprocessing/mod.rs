//! Feature-table transforms
//!
//! Every transform follows the same two-phase contract: `fit` learns state
//! from training data only, `transform` applies it to any table with the same
//! columns and returns a new table. [`Step`] is the serializable union used
//! inside a [`Pipeline`](crate::pipeline::Pipeline).

mod augment;
mod scaler;

pub use augment::FeatureAugmenter;
pub use scaler::{DegeneratePolicy, StandardScaler};

use crate::error::Result;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Two-phase table transform
pub trait Transform {
    /// Learn parameters from `df`
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    /// Apply learned parameters, returning a new table
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

/// A pipeline step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    Augment(FeatureAugmenter),
    Scale(StandardScaler),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Augment(_) => "augment",
            Step::Scale(_) => "scale",
        }
    }
}

impl Transform for Step {
    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        match self {
            Step::Augment(a) => a.fit(df),
            Step::Scale(s) => s.fit(df),
        }
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        match self {
            Step::Augment(a) => a.transform(df),
            Step::Scale(s) => s.transform(df),
        }
    }
}
