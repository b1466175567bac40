//! Integration test: stratified folds and grid search over real pipelines

use diagnosis_pipeline::data::synthetic::breast_cancer_like;
use diagnosis_pipeline::selection::{
    default_grid, expand_all, GridSearch, ModelFamily, ParamGrid, ParamValue, Scoring, StratifiedKFold,
};
use diagnosis_pipeline::PipelineError;
use std::collections::HashSet;

mod common;
use common::template;

#[test]
fn test_folds_partition_and_stratify() {
    let dataset = breast_cancer_like(50, 75, 5).unwrap();
    let folds = StratifiedKFold::new(5).split(dataset.target()).unwrap();
    assert_eq!(folds.len(), 5);

    let mut seen = HashSet::new();
    for fold in &folds {
        for &i in &fold.test_indices {
            assert!(seen.insert(i), "row {} appears in two validation folds", i);
        }
        let malignant = fold
            .test_indices
            .iter()
            .filter(|&&i| dataset.target()[i] == 0.0)
            .count();
        assert_eq!(malignant, 10, "each fold keeps the 2:3 class ratio");
        assert_eq!(fold.test_indices.len() + fold.train_indices.len(), 125);
    }
    assert_eq!(seen.len(), 125);
}

#[test]
fn test_too_many_folds_for_smallest_class() {
    let dataset = breast_cancer_like(3, 20, 5).unwrap();
    assert!(StratifiedKFold::new(5).split(dataset.target()).is_err());
}

#[test]
fn test_default_grid_size() {
    let candidates = expand_all(&default_grid());
    assert_eq!(candidates.len(), 18);
    assert_eq!(candidates[0].family(), ModelFamily::LogisticRegression);
    assert_eq!(candidates[17].family(), ModelFamily::Svc);
}

#[test]
fn test_single_candidate_is_selected() {
    let dataset = breast_cancer_like(40, 60, 9).unwrap();
    let grid = vec![ParamGrid::new(ModelFamily::Svc)
        .with_param("C", vec![ParamValue::Float(1.0)])
        .with_param("kernel", vec![ParamValue::str("linear")])];

    let outcome = GridSearch::new(grid)
        .with_cv(StratifiedKFold::new(3))
        .fit(&template(), dataset.features(), dataset.target())
        .unwrap();

    assert_eq!(outcome.summary.results.len(), 1);
    assert_eq!(outcome.best_candidate().family(), ModelFamily::Svc);
    assert_eq!(outcome.summary.best().rank, 1);
    assert_eq!(outcome.summary.best().fold_scores.len(), 3);
    assert!(outcome.pipeline.is_fitted());
}

#[test]
fn test_search_is_deterministic() {
    let dataset = breast_cancer_like(40, 60, 9).unwrap();
    let grid = vec![
        ParamGrid::new(ModelFamily::LogisticRegression)
            .with_param("C", vec![ParamValue::Float(0.1), ParamValue::Float(1.0)]),
        ParamGrid::new(ModelFamily::RandomForest)
            .with_param("n_estimators", vec![ParamValue::Int(10)])
            .with_param("max_depth", vec![ParamValue::None, ParamValue::Int(3)]),
    ];
    let search = GridSearch::new(grid)
        .with_cv(StratifiedKFold::new(3).with_shuffle(true, 7))
        .with_scoring(Scoring::F1);

    let first = search.fit(&template(), dataset.features(), dataset.target()).unwrap();
    let second = search.fit(&template(), dataset.features(), dataset.target()).unwrap();

    // Fit timings differ between runs; everything scored must not
    for (a, b) in first.summary.results.iter().zip(&second.summary.results) {
        assert_eq!(a.candidate, b.candidate);
        assert_eq!(a.fold_scores, b.fold_scores);
        assert_eq!(a.rank, b.rank);
    }
    assert_eq!(first.summary.best_index, second.summary.best_index);
    assert_eq!(first.summary.scoring, Scoring::F1);
    let leaderboard = first.summary.leaderboard();
    assert!(leaderboard.windows(2).all(|w| w[0].rank <= w[1].rank));
}

#[test]
fn test_empty_grid_is_search_exhaustion() {
    let dataset = breast_cancer_like(20, 30, 1).unwrap();
    let err = GridSearch::new(Vec::new())
        .fit(&template(), dataset.features(), dataset.target())
        .unwrap_err();
    assert!(matches!(err, PipelineError::SearchExhaustion));
}
