//! Experiment tracking
//!
//! Records training runs (parameters, metrics, artifact paths) and persists
//! them under a local experiments directory so runs can be compared later.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{Experiment, ExperimentTracker, Run, RunStatus};
