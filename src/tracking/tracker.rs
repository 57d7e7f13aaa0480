//! Run lifecycle for experiment tracking
//!
//! One [`ExperimentTracker`] covers one training invocation. Runs are
//! sequential: a run must be ended (or failed) before the next one starts.

use crate::error::{HeartmlError, Result};
use crate::tracking::storage::{LocalStorage, StorageBackend};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// One tracked run: a single candidate's training pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    /// Milliseconds since the Unix epoch.
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub artifacts: Vec<String>,
}

/// A named group of runs from one training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: u64,
    pub runs: Vec<Run>,
    pub tags: BTreeMap<String, String>,
}

/// Tracks runs for a single experiment and persists after every
/// completed run.
pub struct ExperimentTracker {
    experiment: Experiment,
    storage: LocalStorage,
    active: Option<usize>,
}

impl ExperimentTracker {
    pub fn new(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let created_at = epoch_millis();
        let experiment = Experiment {
            experiment_id: format!("{name}-{created_at}"),
            name,
            created_at,
            runs: Vec::new(),
            tags: BTreeMap::new(),
        };
        Self {
            experiment,
            storage: LocalStorage::new(base_dir.into()),
            active: None,
        }
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.experiment.tags.insert(key.into(), value.into());
    }

    /// Open a new run. Fails if a run is still active.
    pub fn start_run(&mut self, run_name: impl Into<String>) -> Result<&str> {
        if self.active.is_some() {
            return Err(HeartmlError::Training(
                "a run is already active, end it before starting another".to_string(),
            ));
        }
        let run_name = run_name.into();
        let run = Run {
            run_id: format!("run-{}-{}", self.experiment.runs.len() + 1, run_name),
            run_name,
            start_time: epoch_millis(),
            end_time: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        };
        self.experiment.runs.push(run);
        let idx = self.experiment.runs.len() - 1;
        self.active = Some(idx);
        Ok(&self.experiment.runs[idx].run_id)
    }

    pub fn log_param(&mut self, key: impl Into<String>, value: impl ToString) -> Result<()> {
        let run = self.active_run_mut()?;
        run.params.insert(key.into(), value.to_string());
        Ok(())
    }

    pub fn log_metric(&mut self, key: impl Into<String>, value: f64) -> Result<()> {
        let run = self.active_run_mut()?;
        run.metrics.insert(key.into(), value);
        Ok(())
    }

    pub fn log_artifact(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let run = self.active_run_mut()?;
        run.artifacts.push(path.as_ref().display().to_string());
        Ok(())
    }

    /// Close the active run as finished and persist.
    pub fn end_run(&mut self) -> Result<()> {
        self.close_active(RunStatus::Finished)
    }

    /// Close the active run as failed and persist. Used when a candidate
    /// aborts so the partial record survives.
    pub fn fail_run(&mut self) -> Result<()> {
        self.close_active(RunStatus::Failed)
    }

    pub fn runs(&self) -> &[Run] {
        &self.experiment.runs
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    fn active_run_mut(&mut self) -> Result<&mut Run> {
        let idx = self
            .active
            .ok_or_else(|| HeartmlError::Training("no active run".to_string()))?;
        Ok(&mut self.experiment.runs[idx])
    }

    fn close_active(&mut self, status: RunStatus) -> Result<()> {
        let idx = self
            .active
            .take()
            .ok_or_else(|| HeartmlError::Training("no active run to end".to_string()))?;
        let run = &mut self.experiment.runs[idx];
        run.end_time = Some(epoch_millis());
        run.status = status;
        tracing::info!(
            run_id = %run.run_id,
            status = ?run.status,
            metrics = run.metrics.len(),
            "run closed"
        );
        self.storage
            .save_experiments(std::slice::from_ref(&self.experiment))
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
