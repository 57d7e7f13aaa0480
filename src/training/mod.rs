//! Model training module
//!
//! Provides the candidate models (logistic regression, random forest),
//! stratified splitting and cross-validation, classification metrics, and
//! the [`TrainEngine`] that runs the whole tournament.

mod engine;
pub mod cross_validation;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod tree;

pub use cross_validation::{stratified_train_test_split, CVSplit, StratifiedKFold};
pub use engine::{
    default_candidates, Candidate, CandidateReport, TrainConfig, TrainEngine, TrainingReport,
    TrainingSummary,
};
pub use forest::{MaxFeatures, RandomForest};
pub use logistic::LogisticRegression;
pub use metrics::{ClassificationMetrics, DECISION_THRESHOLD};
pub use tree::{DecisionTree, TreeNode};
