//! Integration test: training end-to-end, from frame to artifacts

use heartml::data;
use heartml::features::{split_xy, FeatureSpec, Preprocessor};
use heartml::pipeline::{ModelKind, Pipeline, Record};
use heartml::training::{
    Candidate, LogisticRegression, RandomForest, TrainConfig, TrainEngine, DECISION_THRESHOLD,
};
use polars::prelude::*;
use tempfile::TempDir;

fn four_row_fixture() -> DataFrame {
    df!(
        "age" => &[63.0, 37.0, 41.0, 56.0],
        "sex" => &[1.0, 1.0, 0.0, 1.0],
        "cp" => &[3.0, 2.0, 1.0, 1.0],
        "trestbps" => &[145.0, 130.0, 130.0, 120.0],
        "chol" => &[233.0, 250.0, 204.0, 236.0],
        "fbs" => &[1.0, 0.0, 0.0, 0.0],
        "restecg" => &[0.0, 1.0, 0.0, 1.0],
        "thalach" => &[150.0, 187.0, 172.0, 178.0],
        "exang" => &[0.0, 0.0, 0.0, 0.0],
        "oldpeak" => &[2.3, 3.5, 1.4, 0.8],
        "slope" => &[0.0, 0.0, 2.0, 2.0],
        "ca" => &[0.0, 0.0, 0.0, 0.0],
        "thal" => &[1.0, 2.0, 2.0, 2.0],
        "target" => &[1.0, 1.0, 0.0, 0.0]
    )
    .unwrap()
}

fn synthetic_record(i: usize) -> Record {
    let positive = i % 2 == 0;
    let jitter = (i % 7) as f64;
    Record {
        age: if positive { 58 + (i % 7) as i64 } else { 42 + (i % 7) as i64 },
        sex: (i % 2) as i64,
        cp: (i % 4) as i64,
        trestbps: if positive { 145.0 + jitter } else { 120.0 + jitter },
        chol: if positive { 260.0 + 2.0 * jitter } else { 200.0 + 2.0 * jitter },
        fbs: ((i / 3) % 2) as i64,
        restecg: (i % 3) as i64,
        thalach: if positive { 130.0 - jitter } else { 170.0 - jitter },
        exang: if positive { 1 } else { 0 },
        oldpeak: if positive { 2.0 + 0.1 * jitter } else { 0.4 + 0.1 * jitter },
        slope: (i % 3) as i64,
        ca: ((i / 2) % 4) as i64,
        thal: (i % 4) as i64,
    }
}

fn synthetic_frame(n: usize) -> DataFrame {
    let records: Vec<Record> = (0..n).map(synthetic_record).collect();
    let target: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
    df!(
        "age" => records.iter().map(|r| r.age as f64).collect::<Vec<_>>(),
        "sex" => records.iter().map(|r| r.sex as f64).collect::<Vec<_>>(),
        "cp" => records.iter().map(|r| r.cp as f64).collect::<Vec<_>>(),
        "trestbps" => records.iter().map(|r| r.trestbps).collect::<Vec<_>>(),
        "chol" => records.iter().map(|r| r.chol).collect::<Vec<_>>(),
        "fbs" => records.iter().map(|r| r.fbs as f64).collect::<Vec<_>>(),
        "restecg" => records.iter().map(|r| r.restecg as f64).collect::<Vec<_>>(),
        "thalach" => records.iter().map(|r| r.thalach).collect::<Vec<_>>(),
        "exang" => records.iter().map(|r| r.exang as f64).collect::<Vec<_>>(),
        "oldpeak" => records.iter().map(|r| r.oldpeak).collect::<Vec<_>>(),
        "slope" => records.iter().map(|r| r.slope as f64).collect::<Vec<_>>(),
        "ca" => records.iter().map(|r| r.ca as f64).collect::<Vec<_>>(),
        "thal" => records.iter().map(|r| r.thal as f64).collect::<Vec<_>>(),
        "target" => target
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

#[test]
fn four_row_fixture_trains_and_predicts() {
    let df = four_row_fixture();
    let spec = FeatureSpec::default();
    let (x, y) = split_xy(&df, &spec).unwrap();
    let y: ndarray::Array1<f64> = y.mapv(|v| v as f64);

    let mut pipeline = Pipeline::new(
        "logreg",
        Preprocessor::new(spec),
        ModelKind::Logistic(LogisticRegression::new().with_max_iter(1000)),
    );
    pipeline.fit(&x, &y).unwrap();

    let row0 = Record {
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
    let (prediction, probability) = pipeline.predict_one(&row0).unwrap();
    assert!(prediction == 0 || prediction == 1);
    assert!((0.0..=1.0).contains(&probability));
}

#[test]
fn prediction_agrees_with_decision_threshold() {
    let df = synthetic_frame(40);
    let spec = FeatureSpec::default();
    let (x, y) = split_xy(&df, &spec).unwrap();
    let y: ndarray::Array1<f64> = y.mapv(|v| v as f64);

    let mut pipeline = Pipeline::new(
        "logreg",
        Preprocessor::new(spec),
        ModelKind::Logistic(LogisticRegression::new().with_max_iter(300)),
    );
    pipeline.fit(&x, &y).unwrap();

    for i in 0..40 {
        let record = synthetic_record(i);
        let (prediction, probability) = pipeline.predict_one(&record).unwrap();
        assert!((0.0..=1.0).contains(&probability));
        assert_eq!(
            prediction == 1,
            probability >= DECISION_THRESHOLD,
            "prediction must follow the decision threshold (p = {probability})"
        );
    }
}

#[test]
fn text_report_covers_every_candidate() {
    let dir = TempDir::new().unwrap();
    let config = TrainConfig {
        out_dir: dir.path().join("model"),
        experiments_dir: dir.path().join("experiments"),
        ..TrainConfig::default()
    };
    let engine = TrainEngine::new(config).with_candidates(small_candidates(42));
    let report = engine.run(&synthetic_frame(60)).unwrap();

    let text = report.generate_report();
    assert!(text.contains("=== Heart Disease Training Report ==="));
    assert!(text.contains("--- logreg ---"));
    assert!(text.contains("--- rf ---"));
    assert!(text.contains(&format!("Best model:  {}", report.summary.best_model)));
}

#[test]
fn csv_to_artifacts_end_to_end() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("heart.csv");
    data::write_csv(&synthetic_frame(80), &csv_path).unwrap();

    let df = data::load_and_validate(&csv_path).unwrap();
    let config = TrainConfig {
        out_dir: dir.path().join("model"),
        experiments_dir: dir.path().join("experiments"),
        ..TrainConfig::default()
    };
    let engine = TrainEngine::new(config.clone()).with_candidates(small_candidates(config.seed));
    let report = engine.run(&df).unwrap();

    assert_eq!(report.n_train + report.n_test, 80);
    assert!(["logreg", "rf"].contains(&report.summary.best_model.as_str()));

    // summary artifact carries everything needed to find the final model
    let summary_raw = std::fs::read_to_string(config.out_dir.join("training_summary.json")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&summary_raw).unwrap();
    assert!(summary["best_model"].is_string());
    assert!(summary["best_holdout"]["roc_auc"].is_f64());
    assert!(summary["best_cv"]["roc_auc"].is_f64());
    let final_path = summary["final_model_path"].as_str().unwrap().to_string();

    // the persisted final pipeline serves predictions after reload
    let pipeline = Pipeline::load(&final_path).unwrap();
    let (prediction, probability) = pipeline.predict_one(&synthetic_record(0)).unwrap();
    assert!(prediction == 0 || prediction == 1);
    assert!((0.0..=1.0).contains(&probability));

    // per-candidate artifacts and the experiment record are on disk too
    assert!(config.out_dir.join("logreg_pipeline.json").exists());
    assert!(config.out_dir.join("rf_pipeline.json").exists());
    assert!(config.experiments_dir.join("experiments.json").exists());
}
