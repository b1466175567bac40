//! End-to-end orchestration: explore, split, select, evaluate, export

use crate::config::WorkflowConfig;
use crate::data::{train_test_split, Dataset};
use crate::error::Result;
use crate::evaluation::ClassificationReport;
use crate::exploration::{self, ExplorationReport};
use crate::export::{save_pipeline, ModelMetadata};
use crate::models::{Estimator, LogisticRegression};
use crate::pipeline::Pipeline;
use crate::preprocessing::FeatureAugmenter;
use crate::selection::{GridSearch, SearchSummary, StratifiedKFold};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Row counts on either side of the split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
}

/// What a complete run produced
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub exploration: ExplorationReport,
    pub split: SplitSizes,
    pub search: SearchSummary,
    pub evaluation: ClassificationReport,
    pub pipeline: Pipeline,
    pub metadata: ModelMetadata,
    pub artifact_path: PathBuf,
}

/// Runs the stages in order over an already loaded dataset
pub struct Workflow {
    config: WorkflowConfig,
}

impl Workflow {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Unfitted augment -> scale pipeline; the classifier is replaced per candidate
    pub fn template(&self) -> Pipeline {
        let augment = &self.config.augment;
        Pipeline::standard(
            FeatureAugmenter::new(&augment.left, &augment.right, &augment.output),
            self.config.scaling.degenerate_policy,
            Estimator::LogisticRegression(LogisticRegression::default()),
        )
    }

    /// Diagnostics only; nothing here feeds later stages
    pub fn explore(&self, dataset: &Dataset) -> Result<ExplorationReport> {
        let exploration = &self.config.exploration;
        exploration::explore(dataset, &exploration.mutual_information, &exploration.target_names)
    }

    /// Explore, split, grid-search, evaluate the winner and write the artifact
    pub fn run(&self, dataset: &Dataset) -> Result<WorkflowOutcome> {
        self.config.validate()?;
        let config = &self.config;
        let total = Instant::now();

        let stage = Instant::now();
        let exploration = self.explore(dataset)?;
        info!(stage = "explore", elapsed_ms = stage.elapsed().as_millis() as u64, "Stage complete");

        let stage = Instant::now();
        let split = train_test_split(
            dataset,
            config.split.test_size,
            config.split.random_state,
            config.split.stratify,
        )?;
        let sizes = SplitSizes {
            train: split.train.n_samples(),
            test: split.test.n_samples(),
        };
        info!(
            stage = "split",
            train = sizes.train,
            test = sizes.test,
            elapsed_ms = stage.elapsed().as_millis() as u64,
            "Stage complete"
        );

        let stage = Instant::now();
        let search = &config.search;
        let outcome = GridSearch::new(search.grid.clone())
            .with_cv(StratifiedKFold::new(search.cv_folds).with_shuffle(search.shuffle, search.random_state))
            .with_scoring(search.scoring)
            .with_random_state(search.random_state)
            .fit(&self.template(), split.train.features(), split.train.target())?;
        info!(
            stage = "select",
            best = %outcome.best_candidate(),
            cv_score = outcome.best_score(),
            elapsed_ms = stage.elapsed().as_millis() as u64,
            "Stage complete"
        );

        let stage = Instant::now();
        let predictions = outcome.pipeline.predict(split.test.features())?;
        let evaluation = ClassificationReport::compute(
            split.test.target(),
            &predictions,
            &config.exploration.target_names,
        )?;
        info!(
            stage = "evaluate",
            accuracy = evaluation.accuracy,
            elapsed_ms = stage.elapsed().as_millis() as u64,
            "Stage complete"
        );

        let stage = Instant::now();
        let best = outcome.best_candidate();
        let metadata = ModelMetadata::new(&config.export.model_name)
            .with_features(dataset.feature_names())
            .with_target(dataset.target_name())
            .with_model_family(best.family().name())
            .with_hyperparameters(best.describe_params())
            .with_cv_score(search.scoring.name(), outcome.best_score())
            .with_test_metrics(evaluation.clone());
        save_pipeline(&outcome.pipeline, &metadata, &config.export.path, config.export.format)?;
        info!(
            stage = "export",
            path = %config.export.path.display(),
            elapsed_ms = stage.elapsed().as_millis() as u64,
            "Stage complete"
        );

        info!(elapsed_secs = total.elapsed().as_secs_f64(), "Workflow finished");

        Ok(WorkflowOutcome {
            exploration,
            split: sizes,
            search: outcome.summary,
            evaluation,
            pipeline: outcome.pipeline,
            metadata,
            artifact_path: config.export.path.clone(),
        })
    }
}
