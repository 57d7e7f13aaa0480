//! Storage backend for experiment tracking

use crate::error::Result;
use crate::tracking::tracker::Experiment;
use std::fs;
use std::path::PathBuf;

/// Where experiment records are persisted.
pub trait StorageBackend {
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()>;
    fn load_experiments(&self) -> Result<Vec<Experiment>>;
}

/// Local filesystem backend writing a single `experiments.json`.
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }
}

impl StorageBackend for LocalStorage {
    fn save_experiments(&self, experiments: &[Experiment]) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        let json = serde_json::to_string_pretty(experiments)?;
        fs::write(self.experiments_file(), json)?;
        Ok(())
    }

    fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path)?;
        let experiments = serde_json::from_str(&contents)?;
        Ok(experiments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::tracker::{Run, RunStatus};
    use std::collections::BTreeMap;

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().to_path_buf());

        let mut params = BTreeMap::new();
        params.insert("model_name".to_string(), "logreg".to_string());
        let mut metrics = BTreeMap::new();
        metrics.insert("holdout_roc_auc".to_string(), 0.9);

        let exp = Experiment {
            experiment_id: "heart-disease-1".to_string(),
            name: "heart-disease".to_string(),
            created_at: 1_700_000_000_000,
            runs: vec![Run {
                run_id: "run-1-logreg".to_string(),
                run_name: "logreg".to_string(),
                start_time: 1_700_000_000_100,
                end_time: Some(1_700_000_001_000),
                status: RunStatus::Finished,
                params,
                metrics,
                artifacts: vec!["artifacts/model/logreg_pipeline.json".to_string()],
            }],
            tags: BTreeMap::new(),
        };

        storage.save_experiments(&[exp]).unwrap();
        assert!(storage.experiments_file().exists());

        let loaded = storage.load_experiments().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].runs[0].run_name, "logreg");
        assert_eq!(loaded[0].runs[0].metrics["holdout_roc_auc"], 0.9);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("never_created"));
        assert!(storage.load_experiments().unwrap().is_empty());
    }
}
