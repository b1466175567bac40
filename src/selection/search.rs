//! Exhaustive grid search under stratified k-fold cross-validation

use super::cv::{CvSplit, StratifiedKFold};
use super::grid::{expand_all, Candidate, ParamGrid};
use crate::data::take_rows;
use crate::error::{PipelineError, Result};
use crate::evaluation::metrics;
use crate::models::Estimator;
use crate::pipeline::Pipeline;
use ndarray::Array1;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Validation-fold score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    Accuracy,
    /// Precision of label 1
    Precision,
    /// Recall of label 1
    Recall,
    /// F1 of label 1
    F1,
}

impl Scoring {
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        match self {
            Scoring::Accuracy => metrics::accuracy(y_true, y_pred),
            Scoring::Precision => metrics::precision(y_true, y_pred, 1.0),
            Scoring::Recall => metrics::recall(y_true, y_pred, 1.0),
            Scoring::F1 => metrics::f1(y_true, y_pred, 1.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::Precision => "precision",
            Scoring::Recall => "recall",
            Scoring::F1 => "f1",
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cross-validation result for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate: Candidate,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    /// 1 = best; equal means share a rank
    pub rank: usize,
    pub mean_fit_secs: f64,
}

/// Everything the search measured, without the fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub results: Vec<CandidateResult>,
    pub best_index: usize,
    pub scoring: Scoring,
    pub n_splits: usize,
}

impl SearchSummary {
    pub fn best(&self) -> &CandidateResult {
        &self.results[self.best_index]
    }

    /// Results ordered by rank, grid order within a rank
    pub fn leaderboard(&self) -> Vec<&CandidateResult> {
        let mut ordered: Vec<&CandidateResult> = self.results.iter().collect();
        ordered.sort_by_key(|r| r.rank);
        ordered
    }
}

/// Search results plus the winner refit on the full training data
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub summary: SearchSummary,
    pub pipeline: Pipeline,
}

impl SearchOutcome {
    pub fn best_candidate(&self) -> &Candidate {
        &self.summary.best().candidate
    }

    pub fn best_score(&self) -> f64 {
        self.summary.best().mean_score
    }
}

/// Training and validation frames for one fold
struct FoldData {
    train: DataFrame,
    y_train: Array1<f64>,
    test: DataFrame,
    y_test: Array1<f64>,
}

impl FoldData {
    fn new(df: &DataFrame, y: &Array1<f64>, split: &CvSplit) -> Result<Self> {
        Ok(Self {
            train: take_rows(df, &split.train_indices)?,
            y_train: split.train_indices.iter().map(|&i| y[i]).collect(),
            test: take_rows(df, &split.test_indices)?,
            y_test: split.test_indices.iter().map(|&i| y[i]).collect(),
        })
    }
}

/// Grid search over one or more family grids
#[derive(Debug, Clone)]
pub struct GridSearch {
    grids: Vec<ParamGrid>,
    cv: StratifiedKFold,
    scoring: Scoring,
    random_state: u64,
}

impl GridSearch {
    pub fn new(grids: Vec<ParamGrid>) -> Self {
        Self {
            grids,
            cv: StratifiedKFold::default(),
            scoring: Scoring::default(),
            random_state: 42,
        }
    }

    pub fn with_cv(mut self, cv: StratifiedKFold) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Seed handed to every stochastic classifier
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        expand_all(&self.grids)
    }

    /// Evaluate every candidate on every fold and refit the winner.
    ///
    /// `template` supplies the transform steps; its classifier is replaced
    /// per candidate. (candidate, fold) units run on rayon and are collected
    /// in grid order, so the winner does not depend on scheduling. Ties go
    /// to the earliest candidate.
    pub fn fit(&self, template: &Pipeline, df: &DataFrame, y: &Array1<f64>) -> Result<SearchOutcome> {
        let candidates = self.candidates();
        if candidates.is_empty() {
            return Err(PipelineError::SearchExhaustion);
        }

        let estimators: Vec<Estimator> = candidates
            .iter()
            .map(|c| Estimator::from_candidate(c, self.random_state))
            .collect::<Result<_>>()?;

        let splits = self.cv.split(y)?;
        let folds: Vec<FoldData> = splits
            .iter()
            .map(|split| FoldData::new(df, y, split))
            .collect::<Result<_>>()?;
        let n_splits = folds.len();

        info!(
            candidates = candidates.len(),
            folds = n_splits,
            scoring = %self.scoring,
            "Starting grid search"
        );
        let start = Instant::now();

        let units: Vec<(f64, f64)> = (0..candidates.len() * n_splits)
            .into_par_iter()
            .map(|unit| {
                let (ci, fi) = (unit / n_splits, unit % n_splits);
                let fold = &folds[fi];

                let mut pipeline = template.with_estimator(estimators[ci].clone());
                pipeline.fit(&fold.train, &fold.y_train)?;
                let predictions = pipeline.predict(&fold.test)?;
                let score = self.scoring.score(&fold.y_test, &predictions);

                debug!(candidate = %candidates[ci], fold = fi, score, "Fold evaluated");
                Ok((score, pipeline.fit_time().unwrap_or(0.0)))
            })
            .collect::<Result<_>>()?;

        let mut results: Vec<CandidateResult> = candidates
            .into_iter()
            .zip(units.chunks(n_splits))
            .map(|(candidate, chunk)| {
                let fold_scores: Vec<f64> = chunk.iter().map(|(s, _)| *s).collect();
                let n = fold_scores.len() as f64;
                let mean_score = fold_scores.iter().sum::<f64>() / n;
                let std_score = (fold_scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n).sqrt();
                CandidateResult {
                    candidate,
                    fold_scores,
                    mean_score,
                    std_score,
                    rank: 0,
                    mean_fit_secs: chunk.iter().map(|(_, t)| *t).sum::<f64>() / n,
                }
            })
            .collect();

        let means: Vec<f64> = results.iter().map(|r| r.mean_score).collect();
        for result in &mut results {
            result.rank = 1 + means.iter().filter(|&&m| m > result.mean_score).count();
        }

        let mut best_index = 0;
        for (i, mean) in means.iter().enumerate() {
            if *mean > means[best_index] {
                best_index = i;
            }
        }

        let best = &results[best_index];
        info!(
            best = %best.candidate,
            mean_score = best.mean_score,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Grid search finished"
        );

        let mut pipeline = template.with_estimator(estimators[best_index].clone());
        pipeline.fit(df, y)?;

        Ok(SearchOutcome {
            summary: SearchSummary {
                results,
                best_index,
                scoring: self.scoring,
                n_splits,
            },
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{ModelFamily, ParamValue};
    use crate::preprocessing::{DegeneratePolicy, FeatureAugmenter};
    use polars::prelude::*;

    fn template() -> Pipeline {
        Pipeline::standard(
            FeatureAugmenter::default(),
            DegeneratePolicy::Identity,
            Estimator::from_candidate(&Candidate::new(ModelFamily::LogisticRegression), 0).unwrap(),
        )
    }

    fn data() -> (DataFrame, Array1<f64>) {
        let radius: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 + i as f64 * 0.05 } else { 3.0 + i as f64 * 0.05 }).collect();
        let texture: Vec<f64> = (0..20).map(|i| 2.0 + ((i * 7) % 5) as f64 * 0.1).collect();
        let df = df!("mean radius" => radius, "mean texture" => texture).unwrap();
        let y: Array1<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect();
        (df, y)
    }

    #[test]
    fn test_empty_grid_is_exhaustion() {
        let (df, y) = data();
        let search = GridSearch::new(vec![ParamGrid::new(ModelFamily::Svc).with_param("C", vec![])]);
        assert!(matches!(search.fit(&template(), &df, &y), Err(PipelineError::SearchExhaustion)));

        let search = GridSearch::new(vec![]);
        assert!(matches!(search.fit(&template(), &df, &y), Err(PipelineError::SearchExhaustion)));
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let (df, y) = data();
        let grid = ParamGrid::new(ModelFamily::LogisticRegression)
            .with_param("C", vec![ParamValue::Float(1.0), ParamValue::Float(10.0)]);
        let outcome = GridSearch::new(vec![grid])
            .with_cv(StratifiedKFold::new(2))
            .fit(&template(), &df, &y)
            .unwrap();

        let results = &outcome.summary.results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].fold_scores.len(), 2);
        if results[0].mean_score == results[1].mean_score {
            assert_eq!(outcome.summary.best_index, 0);
            assert_eq!(results[0].rank, 1);
            assert_eq!(results[1].rank, 1);
        }
        assert!(outcome.pipeline.is_fitted());
    }

    #[test]
    fn test_invalid_parameter_fails_before_search() {
        let (df, y) = data();
        let grid = ParamGrid::new(ModelFamily::LogisticRegression).with_param("kernel", vec![ParamValue::str("rbf")]);
        let err = GridSearch::new(vec![grid]).fit(&template(), &df, &y).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidParameter { .. }));
    }

    #[test]
    fn test_scoring_names() {
        assert_eq!(Scoring::default(), Scoring::Accuracy);
        assert_eq!(Scoring::F1.to_string(), "f1");
        let scoring: Scoring = serde_json::from_str("\"recall\"").unwrap();
        assert_eq!(scoring, Scoring::Recall);
    }
}
