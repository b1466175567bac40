//! Model selection: parameter grids, stratified folds and grid search

pub mod cv;
pub mod grid;
pub mod search;

pub use cv::{CvSplit, StratifiedKFold};
pub use grid::{default_grid, expand_all, Candidate, ModelFamily, ParamGrid, ParamValue};
pub use search::{CandidateResult, GridSearch, Scoring, SearchOutcome, SearchSummary};
