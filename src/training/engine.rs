//! Multi-candidate training engine
//!
//! Runs every declared candidate through stratified cross-validation on
//! the training partition, scores each on the shared holdout, selects the
//! winner by holdout ROC-AUC and refits it on the full dataset. Artifacts
//! (per-candidate pipelines, the final pipeline, a summary) land under the
//! configured output directory, and every candidate is recorded as one
//! tracked run.

use crate::data;
use crate::error::{HeartmlError, Result};
use crate::features::{split_xy, FeatureSpec, Preprocessor};
use crate::pipeline::{ModelKind, Pipeline};
use crate::tracking::ExperimentTracker;
use crate::training::cross_validation::{stratified_train_test_split, StratifiedKFold};
use crate::training::logistic::LogisticRegression;
use crate::training::forest::RandomForest;
use crate::training::metrics::ClassificationMetrics;
use ndarray::{Array1, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Training configuration with the defaults the CLI exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Fraction of rows reserved for the holdout partition.
    pub test_size: f64,
    /// Number of stratified cross-validation folds.
    pub n_folds: usize,
    /// Seed for the holdout split, fold assignment and forest bootstrap.
    pub seed: u64,
    /// Where pipeline artifacts and the summary are written.
    pub out_dir: PathBuf,
    /// Where experiment records are written.
    pub experiments_dir: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            n_folds: 5,
            seed: 42,
            out_dir: PathBuf::from("artifacts/model"),
            experiments_dir: PathBuf::from("artifacts/experiments"),
        }
    }
}

/// A named model configuration entered into the tournament.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    model: ModelKind,
}

impl Candidate {
    pub fn new(name: impl Into<String>, model: ModelKind) -> Self {
        Self {
            name: name.into(),
            model,
        }
    }

    /// Compose a fresh, unfit pipeline for this candidate. Every fit in
    /// the tournament starts from one of these so no state leaks between
    /// folds or partitions.
    pub fn build_pipeline(&self, spec: &FeatureSpec) -> Pipeline {
        Pipeline::new(
            self.name.clone(),
            Preprocessor::new(spec.clone()),
            self.model.clone(),
        )
    }

    /// Hyperparameters worth recording with the run.
    pub fn params(&self) -> Vec<(String, String)> {
        match &self.model {
            ModelKind::Logistic(m) => vec![
                ("max_iter".to_string(), m.max_iter.to_string()),
                ("learning_rate".to_string(), m.learning_rate.to_string()),
                ("alpha".to_string(), m.alpha.to_string()),
                ("tol".to_string(), m.tol.to_string()),
            ],
            ModelKind::Forest(m) => vec![
                ("n_estimators".to_string(), m.n_estimators.to_string()),
                ("max_features".to_string(), format!("{:?}", m.max_features).to_lowercase()),
                ("bootstrap".to_string(), m.bootstrap.to_string()),
                (
                    "random_state".to_string(),
                    m.random_state.map_or("none".to_string(), |s| s.to_string()),
                ),
            ],
        }
    }
}

/// The default tournament, in declared order. Order matters: ties on the
/// holdout score go to the earlier candidate.
pub fn default_candidates(seed: u64) -> Vec<Candidate> {
    vec![
        Candidate::new(
            "logreg",
            ModelKind::Logistic(LogisticRegression::new().with_max_iter(2000)),
        ),
        Candidate::new(
            "rf",
            ModelKind::Forest(RandomForest::new(400).with_random_state(seed)),
        ),
    ]
}

/// Scores for one candidate across both evaluation stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    /// Per-fold cross-validation scores, in fold order.
    pub cv_folds: Vec<ClassificationMetrics>,
    /// Mean of the fold scores.
    pub cv: ClassificationMetrics,
    /// Scores on the holdout partition.
    pub holdout: ClassificationMetrics,
    pub training_time_secs: f64,
}

/// The persisted `training_summary.json` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub best_model: String,
    pub best_holdout: ClassificationMetrics,
    pub best_cv: ClassificationMetrics,
    pub final_model_path: String,
}

/// Everything a caller needs to inspect a finished training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub candidates: Vec<CandidateReport>,
    pub summary: TrainingSummary,
    pub n_train: usize,
    pub n_test: usize,
    pub elapsed_secs: f64,
}

impl TrainingReport {
    /// Text report for terminal display.
    pub fn generate_report(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Heart Disease Training Report ===\n\n");
        report.push_str(&format!(
            "Samples:  {} train / {} holdout\n",
            self.n_train, self.n_test
        ));
        report.push_str(&format!("Elapsed:  {:.2} seconds\n\n", self.elapsed_secs));

        for candidate in &self.candidates {
            report.push_str(&format!("--- {} ---\n", candidate.name));
            report.push_str(&format!(
                "CV mean:  accuracy {:.4}  precision {:.4}  recall {:.4}  roc_auc {:.4}\n",
                candidate.cv.accuracy,
                candidate.cv.precision,
                candidate.cv.recall,
                candidate.cv.roc_auc
            ));
            report.push_str(&format!(
                "Holdout:  accuracy {:.4}  precision {:.4}  recall {:.4}  roc_auc {:.4}\n",
                candidate.holdout.accuracy,
                candidate.holdout.precision,
                candidate.holdout.recall,
                candidate.holdout.roc_auc
            ));
            report.push_str(&format!(
                "Time:     {:.2} seconds\n\n",
                candidate.training_time_secs
            ));
        }

        report.push_str(&format!(
            "Best model:  {} (holdout ROC-AUC {:.4})\n",
            self.summary.best_model, self.summary.best_holdout.roc_auc
        ));
        report.push_str(&format!("Final model: {}\n", self.summary.final_model_path));
        report
    }
}

/// Orchestrates the whole training flow over a raw feature frame.
pub struct TrainEngine {
    config: TrainConfig,
    spec: FeatureSpec,
    candidates: Vec<Candidate>,
}

impl TrainEngine {
    pub fn new(config: TrainConfig) -> Self {
        let candidates = default_candidates(config.seed);
        Self {
            config,
            spec: FeatureSpec::default(),
            candidates,
        }
    }

    pub fn with_spec(mut self, spec: FeatureSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Replace the default tournament. The declared order still decides
    /// tie-breaks.
    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Clean, split, evaluate every candidate, select and refit the
    /// winner, and persist all artifacts.
    pub fn run(&self, df: &DataFrame) -> Result<TrainingReport> {
        if self.candidates.is_empty() {
            return Err(HeartmlError::Training(
                "no candidates declared".to_string(),
            ));
        }
        let start = Instant::now();

        let cleaned = data::clean(df, &self.spec)?;
        let (x_all, y_raw) = split_xy(&cleaned, &self.spec)?;
        let y_all = y_raw.mapv(|v| v as f64);

        let (train_idx, test_idx) =
            stratified_train_test_split(&y_all, self.config.test_size, self.config.seed)?;
        let x_train = take_rows(&x_all, &train_idx)?;
        let x_test = take_rows(&x_all, &test_idx)?;
        let y_train = y_all.select(Axis(0), &train_idx);
        let y_test = y_all.select(Axis(0), &test_idx);
        info!(
            n_train = train_idx.len(),
            n_test = test_idx.len(),
            "holdout split ready"
        );

        let mut tracker =
            ExperimentTracker::new("heart-disease", self.config.experiments_dir.clone());
        tracker.set_tag("seed", self.config.seed.to_string());

        let mut reports = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            tracker.start_run(&candidate.name)?;
            tracker.log_param("model_name", &candidate.name)?;
            for (key, value) in candidate.params() {
                tracker.log_param(key, value)?;
            }

            // Any candidate failure aborts the whole invocation.
            let outcome = self.evaluate_candidate(
                candidate, &x_train, &y_train, &x_test, &y_test,
            );
            let (report, fitted) = match outcome {
                Ok(pair) => pair,
                Err(e) => {
                    tracker.fail_run()?;
                    return Err(e);
                }
            };

            for (key, value) in report.cv.to_map() {
                tracker.log_metric(format!("cv_{key}_mean"), value)?;
            }
            for (key, value) in report.holdout.to_map() {
                tracker.log_metric(format!("holdout_{key}"), value)?;
            }

            let artifact = self
                .config
                .out_dir
                .join(format!("{}_pipeline.json", candidate.name));
            fitted.save(&artifact)?;
            tracker.log_artifact(&artifact)?;
            tracker.end_run()?;

            info!(
                candidate = %report.name,
                cv_roc_auc = report.cv.roc_auc,
                holdout_roc_auc = report.holdout.roc_auc,
                "candidate evaluated"
            );
            reports.push(report);
        }

        let best_idx = select_best(&reports);
        let best = &self.candidates[best_idx];

        // The winner refits from scratch on every row, train and holdout.
        let mut final_pipeline = best.build_pipeline(&self.spec);
        final_pipeline.fit(&x_all, &y_all)?;
        let final_path = self.config.out_dir.join("final_pipeline.json");
        final_pipeline.save(&final_path)?;

        let summary = TrainingSummary {
            best_model: best.name.clone(),
            best_holdout: reports[best_idx].holdout,
            best_cv: reports[best_idx].cv,
            final_model_path: final_path.display().to_string(),
        };
        let summary_path = self.config.out_dir.join("training_summary.json");
        std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;

        info!(
            best = %summary.best_model,
            holdout_roc_auc = summary.best_holdout.roc_auc,
            "training complete"
        );

        Ok(TrainingReport {
            candidates: reports,
            summary,
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Cross-validate on the training partition, then fit on all of it
    /// and score the holdout. Returns the holdout-fitted pipeline for
    /// persistence.
    fn evaluate_candidate(
        &self,
        candidate: &Candidate,
        x_train: &DataFrame,
        y_train: &Array1<f64>,
        x_test: &DataFrame,
        y_test: &Array1<f64>,
    ) -> Result<(CandidateReport, Pipeline)> {
        let t0 = Instant::now();

        let kfold = StratifiedKFold::new(self.config.n_folds).with_random_state(self.config.seed);
        let splits = kfold.split(y_train)?;
        let mut cv_folds = Vec::with_capacity(splits.len());
        for split in &splits {
            let x_fit = take_rows(x_train, &split.train_indices)?;
            let y_fit = y_train.select(Axis(0), &split.train_indices);
            let x_val = take_rows(x_train, &split.test_indices)?;
            let y_val = y_train.select(Axis(0), &split.test_indices);

            let mut pipeline = candidate.build_pipeline(&self.spec);
            pipeline.fit(&x_fit, &y_fit)?;
            let proba = pipeline.predict_proba_frame(&x_val)?;
            let fold = ClassificationMetrics::compute(&y_val, &proba)?;
            debug!(
                candidate = %candidate.name,
                fold = split.fold_idx,
                roc_auc = fold.roc_auc,
                "fold scored"
            );
            cv_folds.push(fold);
        }
        let cv = ClassificationMetrics::mean_of(&cv_folds);

        let mut pipeline = candidate.build_pipeline(&self.spec);
        pipeline.fit(x_train, y_train)?;
        let proba = pipeline.predict_proba_frame(x_test)?;
        let holdout = ClassificationMetrics::compute(y_test, &proba)?;

        let report = CandidateReport {
            name: candidate.name.clone(),
            cv_folds,
            cv,
            holdout,
            training_time_secs: t0.elapsed().as_secs_f64(),
        };
        Ok((report, pipeline))
    }
}

/// Index of the winning candidate: highest holdout ROC-AUC, with ties
/// going to the earliest entry.
fn select_best(reports: &[CandidateReport]) -> usize {
    let mut best_idx = 0;
    for (idx, report) in reports.iter().enumerate().skip(1) {
        if report.holdout.roc_auc > reports[best_idx].holdout.roc_auc {
            best_idx = idx;
        }
    }
    best_idx
}

/// Row subset of a cleaned feature frame.
fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let cast = series.cast(&DataType::Float64)?;
        let values = cast.f64()?;
        let taken = indices
            .iter()
            .map(|&i| {
                values.get(i).ok_or_else(|| {
                    HeartmlError::Data(format!("row index {i} out of bounds"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        columns.push(Series::new(series.name().clone(), taken).into());
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_frame(n: usize) -> DataFrame {
        // Positive rows skew older, higher cholesterol, lower peak heart
        // rate, so both candidates have signal to find.
        let mut age = Vec::with_capacity(n);
        let mut sex = Vec::with_capacity(n);
        let mut cp = Vec::with_capacity(n);
        let mut trestbps = Vec::with_capacity(n);
        let mut chol = Vec::with_capacity(n);
        let mut fbs = Vec::with_capacity(n);
        let mut restecg = Vec::with_capacity(n);
        let mut thalach = Vec::with_capacity(n);
        let mut exang = Vec::with_capacity(n);
        let mut oldpeak = Vec::with_capacity(n);
        let mut slope = Vec::with_capacity(n);
        let mut ca = Vec::with_capacity(n);
        let mut thal = Vec::with_capacity(n);
        let mut target = Vec::with_capacity(n);

        for i in 0..n {
            let positive = i % 2 == 0;
            let jitter = (i % 7) as f64;
            age.push(if positive { 58.0 + jitter } else { 42.0 + jitter });
            sex.push((i % 2) as f64);
            cp.push((i % 4) as f64);
            trestbps.push(if positive { 145.0 + jitter } else { 120.0 + jitter });
            chol.push(if positive { 260.0 + 2.0 * jitter } else { 200.0 + 2.0 * jitter });
            fbs.push(((i / 3) % 2) as f64);
            restecg.push((i % 3) as f64);
            thalach.push(if positive { 130.0 - jitter } else { 170.0 - jitter });
            exang.push(if positive { 1.0 } else { 0.0 });
            oldpeak.push(if positive { 2.0 + 0.1 * jitter } else { 0.4 + 0.1 * jitter });
            slope.push((i % 3) as f64);
            ca.push(((i / 2) % 4) as f64);
            thal.push((i % 4) as f64);
            target.push(if positive { 1.0 } else { 0.0 });
        }

        df!(
            "age" => age, "sex" => sex, "cp" => cp, "trestbps" => trestbps,
            "chol" => chol, "fbs" => fbs, "restecg" => restecg,
            "thalach" => thalach, "exang" => exang, "oldpeak" => oldpeak,
            "slope" => slope, "ca" => ca, "thal" => thal, "target" => target
        )
        .unwrap()
    }

    fn small_candidates(seed: u64) -> Vec<Candidate> {
        vec![
            Candidate::new(
                "logreg",
                ModelKind::Logistic(LogisticRegression::new().with_max_iter(300)),
            ),
            Candidate::new(
                "rf",
                ModelKind::Forest(RandomForest::new(25).with_random_state(seed)),
            ),
        ]
    }

    fn metrics(roc_auc: f64) -> ClassificationMetrics {
        ClassificationMetrics {
            accuracy: 0.8,
            precision: 0.8,
            recall: 0.8,
            roc_auc,
        }
    }

    fn report(name: &str, roc_auc: f64) -> CandidateReport {
        CandidateReport {
            name: name.to_string(),
            cv_folds: Vec::new(),
            cv: metrics(roc_auc),
            holdout: metrics(roc_auc),
            training_time_secs: 0.0,
        }
    }

    #[test]
    fn declared_order_and_defaults() {
        let candidates = default_candidates(42);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "logreg");
        assert_eq!(candidates[1].name, "rf");
        match &candidates[0].model {
            ModelKind::Logistic(m) => assert_eq!(m.max_iter, 2000),
            other => panic!("unexpected model: {other:?}"),
        }
        match &candidates[1].model {
            ModelKind::Forest(m) => {
                assert_eq!(m.n_estimators, 400);
                assert_eq!(m.random_state, Some(42));
            }
            other => panic!("unexpected model: {other:?}"),
        }
    }

    #[test]
    fn tie_goes_to_first_declared() {
        let reports = vec![report("logreg", 0.9), report("rf", 0.9)];
        assert_eq!(select_best(&reports), 0);
    }

    #[test]
    fn higher_holdout_auc_wins() {
        let reports = vec![report("logreg", 0.85), report("rf", 0.91)];
        assert_eq!(select_best(&reports), 1);
    }

    #[test]
    fn full_run_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            out_dir: dir.path().join("model"),
            experiments_dir: dir.path().join("experiments"),
            ..TrainConfig::default()
        };
        let engine = TrainEngine::new(config.clone()).with_candidates(small_candidates(42));

        let df = synthetic_frame(80);
        let report = engine.run(&df).unwrap();

        assert_eq!(report.candidates.len(), 2);
        assert_eq!(report.candidates[0].name, "logreg");
        assert_eq!(report.candidates[1].name, "rf");
        assert_eq!(report.candidates[0].cv_folds.len(), 5);
        assert_eq!(report.n_train + report.n_test, 80);

        assert!(config.out_dir.join("logreg_pipeline.json").exists());
        assert!(config.out_dir.join("rf_pipeline.json").exists());
        assert!(config.out_dir.join("final_pipeline.json").exists());
        assert!(config.out_dir.join("training_summary.json").exists());
        assert!(config.experiments_dir.join("experiments.json").exists());

        let best = &report.summary.best_model;
        assert!(best == "logreg" || best == "rf");
    }

    #[test]
    fn every_candidate_becomes_one_finished_run() {
        use crate::tracking::{LocalStorage, RunStatus, StorageBackend};

        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            out_dir: dir.path().join("model"),
            experiments_dir: dir.path().join("experiments"),
            ..TrainConfig::default()
        };
        TrainEngine::new(config.clone())
            .with_candidates(small_candidates(42))
            .run(&synthetic_frame(80))
            .unwrap();

        let storage = LocalStorage::new(config.experiments_dir.clone());
        let experiments = storage.load_experiments().unwrap();
        assert_eq!(experiments.len(), 1);
        assert_eq!(experiments[0].name, "heart-disease");
        assert_eq!(experiments[0].tags["seed"], "42");

        let runs = &experiments[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_name, "logreg");
        assert_eq!(runs[1].run_name, "rf");
        for run in runs {
            assert_eq!(run.status, RunStatus::Finished);
            assert_eq!(run.params["model_name"], run.run_name);
            assert_eq!(run.artifacts.len(), 1);
            let keys: Vec<&str> = run.metrics.keys().map(|k| k.as_str()).collect();
            assert_eq!(
                keys,
                vec![
                    "cv_accuracy_mean",
                    "cv_precision_mean",
                    "cv_recall_mean",
                    "cv_roc_auc_mean",
                    "holdout_accuracy",
                    "holdout_precision",
                    "holdout_recall",
                    "holdout_roc_auc",
                ]
            );
        }
    }

    #[test]
    fn final_pipeline_reloads_and_predicts() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig {
            out_dir: dir.path().join("model"),
            experiments_dir: dir.path().join("experiments"),
            ..TrainConfig::default()
        };
        let engine = TrainEngine::new(config.clone()).with_candidates(small_candidates(42));
        engine.run(&synthetic_frame(80)).unwrap();

        let pipeline = Pipeline::load(config.out_dir.join("final_pipeline.json")).unwrap();
        let record = crate::pipeline::Record {
            age: 63,
            sex: 1,
            cp: 3,
            trestbps: 145.0,
            chol: 233.0,
            fbs: 1,
            restecg: 0,
            thalach: 150.0,
            exang: 0,
            oldpeak: 2.3,
            slope: 0,
            ca: 0,
            thal: 1,
        };
        let probability = pipeline.predict_probability(&record).unwrap();
        assert!((0.0..=1.0).contains(&probability));
    }

    #[test]
    fn seeded_runs_reproduce_scores() {
        let make_report = || {
            let dir = tempfile::tempdir().unwrap();
            let config = TrainConfig {
                out_dir: dir.path().join("model"),
                experiments_dir: dir.path().join("experiments"),
                ..TrainConfig::default()
            };
            TrainEngine::new(config)
                .with_candidates(small_candidates(42))
                .run(&synthetic_frame(80))
                .unwrap()
        };
        let a = make_report();
        let b = make_report();
        assert_eq!(a.summary.best_model, b.summary.best_model);
        assert_eq!(
            a.candidates[0].holdout.roc_auc,
            b.candidates[0].holdout.roc_auc
        );
        assert_eq!(
            a.candidates[1].holdout.roc_auc,
            b.candidates[1].holdout.roc_auc
        );
    }
}
