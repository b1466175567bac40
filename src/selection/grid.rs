//! Hyperparameter grids and candidate configurations

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classifier family a candidate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    LogisticRegression,
    RandomForest,
    Svc,
}

impl ModelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LogisticRegression => "logistic_regression",
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::Svc => "svc",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single hyperparameter value.
///
/// Untagged so JSON grids read naturally: `10`, `0.1`, `"rbf"`, `true`, `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
}

impl ParamValue {
    pub fn str(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }

    fn type_error(&self, name: &str, expected: &str) -> PipelineError {
        PipelineError::InvalidParameter {
            name: name.to_string(),
            value: self.to_string(),
            reason: format!("expected {}", expected),
        }
    }

    /// Numeric value; integers widen to f64
    pub fn as_f64(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(self.type_error(name, "a number")),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            _ => Err(self.type_error(name, "a non-negative integer")),
        }
    }

    /// `None` or a non-negative integer
    pub fn as_optional_usize(&self, name: &str) -> Result<Option<usize>> {
        match self {
            ParamValue::None => Ok(None),
            other => other
                .as_usize(name)
                .map(Some)
                .map_err(|_| self.type_error(name, "null or a non-negative integer")),
        }
    }

    /// `true`/`false`, or the integers 1/0
    pub fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            ParamValue::Bool(v) => Ok(*v),
            ParamValue::Int(1) => Ok(true),
            ParamValue::Int(0) => Ok(false),
            _ => Err(self.type_error(name, "a boolean")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Str(s) => Ok(s),
            _ => Err(self.type_error(name, "a string")),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::None => f.write_str("None"),
        }
    }
}

/// One entry of the search grid: a family plus concrete hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    family: ModelFamily,
    params: BTreeMap<String, ParamValue>,
}

impl Candidate {
    /// Candidate using the family defaults
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            params: BTreeMap::new(),
        }
    }

    /// Set one hyperparameter
    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Hyperparameters in name order
    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Hyperparameters rendered as strings
    pub fn describe_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.family)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str(")")
    }
}

/// Per-family hyperparameter value sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub family: ModelFamily,
    #[serde(default)]
    pub params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new(family: ModelFamily) -> Self {
        Self {
            family,
            params: BTreeMap::new(),
        }
    }

    /// Add the candidate values for one hyperparameter
    pub fn with_param(mut self, name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        self.params.insert(name.into(), values);
        self
    }

    /// Number of candidates `expand` yields
    pub fn len(&self) -> usize {
        self.params.values().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product of the value sets.
    ///
    /// Parameter names are taken in sorted order and the first name varies
    /// slowest. A grid with no parameters yields one default candidate.
    pub fn expand(&self) -> Vec<Candidate> {
        let mut candidates = vec![Candidate::new(self.family)];
        for (name, values) in &self.params {
            candidates = candidates
                .into_iter()
                .flat_map(|base| {
                    values
                        .iter()
                        .map(move |value| base.clone().with(name.clone(), value.clone()))
                })
                .collect();
        }
        candidates
    }
}

/// Expand several family grids, in order
pub fn expand_all(grids: &[ParamGrid]) -> Vec<Candidate> {
    grids.iter().flat_map(ParamGrid::expand).collect()
}

/// The stock three-family grid (18 candidates)
pub fn default_grid() -> Vec<ParamGrid> {
    let c_values = || {
        vec![
            ParamValue::Float(0.1),
            ParamValue::Float(1.0),
            ParamValue::Float(10.0),
        ]
    };

    vec![
        ParamGrid::new(ModelFamily::LogisticRegression).with_param("C", c_values()),
        ParamGrid::new(ModelFamily::RandomForest)
            .with_param(
                "n_estimators",
                vec![ParamValue::Int(50), ParamValue::Int(100), ParamValue::Int(200)],
            )
            .with_param(
                "max_depth",
                vec![ParamValue::None, ParamValue::Int(10), ParamValue::Int(20)],
            ),
        ParamGrid::new(ModelFamily::Svc)
            .with_param("C", c_values())
            .with_param("kernel", vec![ParamValue::str("linear"), ParamValue::str("rbf")]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size() {
        let grids = default_grid();
        assert_eq!(grids.iter().map(ParamGrid::len).sum::<usize>(), 18);
        assert_eq!(expand_all(&grids).len(), 18);
    }

    #[test]
    fn test_expand_order() {
        let grid = ParamGrid::new(ModelFamily::Svc)
            .with_param("kernel", vec![ParamValue::str("linear"), ParamValue::str("rbf")])
            .with_param("C", vec![ParamValue::Float(0.1), ParamValue::Float(1.0)]);

        let rendered: Vec<String> = grid.expand().iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "svc(C=0.1, kernel=linear)",
                "svc(C=0.1, kernel=rbf)",
                "svc(C=1, kernel=linear)",
                "svc(C=1, kernel=rbf)",
            ]
        );
    }

    #[test]
    fn test_params_stay_within_family() {
        for candidate in expand_all(&default_grid()) {
            let names: Vec<&str> = candidate.params().keys().map(String::as_str).collect();
            match candidate.family() {
                ModelFamily::LogisticRegression => assert_eq!(names, vec!["C"]),
                ModelFamily::RandomForest => assert_eq!(names, vec!["max_depth", "n_estimators"]),
                ModelFamily::Svc => assert_eq!(names, vec!["C", "kernel"]),
            }
        }
    }

    #[test]
    fn test_empty_value_set_yields_nothing() {
        let grid = ParamGrid::new(ModelFamily::LogisticRegression).with_param("C", vec![]);
        assert!(grid.is_empty());
        assert!(grid.expand().is_empty());
    }

    #[test]
    fn test_grid_without_params_is_one_default_candidate() {
        let grid = ParamGrid::new(ModelFamily::RandomForest);
        assert_eq!(grid.expand(), vec![Candidate::new(ModelFamily::RandomForest)]);
    }

    #[test]
    fn test_json_grid() {
        let json = r#"{"family": "random_forest", "params": {"max_depth": [null, 5], "n_estimators": [10]}}"#;
        let grid: ParamGrid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.family, ModelFamily::RandomForest);
        assert_eq!(grid.params["max_depth"], vec![ParamValue::None, ParamValue::Int(5)]);
    }

    #[test]
    fn test_param_value_conversions() {
        assert_eq!(ParamValue::Int(3).as_f64("C").unwrap(), 3.0);
        assert!(ParamValue::Float(0.5).as_usize("n").is_err());
        assert_eq!(ParamValue::None.as_optional_usize("d").unwrap(), None);
        assert!(ParamValue::Int(-1).as_optional_usize("d").is_err());
        assert!(ParamValue::Int(0).as_bool("bootstrap").is_ok_and(|b| !b));
        assert!(ParamValue::Int(2).as_bool("bootstrap").is_err());
    }

    #[test]
    fn test_json_grid_booleans() {
        let json = r#"{"family": "random_forest", "params": {"bootstrap": [true, false]}}"#;
        let grid: ParamGrid = serde_json::from_str(json).unwrap();
        assert_eq!(grid.params["bootstrap"], vec![ParamValue::Bool(true), ParamValue::Bool(false)]);
        assert_eq!(grid.expand()[0].to_string(), "random_forest(bootstrap=true)");
    }
}
