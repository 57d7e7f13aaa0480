//! The deployable unit: a fitted preprocessor plus a fitted model
//!
//! A [`Pipeline`] is what training persists and serving loads. It owns no
//! reference back to the data it was fit on and is immutable once fitted.

use crate::error::{HeartmlError, Result};
use crate::features::Preprocessor;
use crate::training::{LogisticRegression, RandomForest};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One observation's feature values, typed at the serving boundary.
///
/// Integer-coded clinical categories are integers here so a malformed
/// request fails deserialization instead of silently truncating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub age: i64,
    pub sex: i64,
    pub cp: i64,
    pub trestbps: f64,
    pub chol: f64,
    pub fbs: i64,
    pub restecg: i64,
    pub thalach: f64,
    pub exang: i64,
    pub oldpeak: f64,
    pub slope: i64,
    pub ca: i64,
    pub thal: i64,
}

impl Record {
    /// Check every field against its declared range. All violations are
    /// reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        check_int(&mut violations, "age", self.age, 1, 120);
        check_int(&mut violations, "sex", self.sex, 0, 1);
        check_int(&mut violations, "cp", self.cp, 0, 3);
        check_float(&mut violations, "trestbps", self.trestbps, 50.0, 250.0);
        check_float(&mut violations, "chol", self.chol, 50.0, 700.0);
        check_int(&mut violations, "fbs", self.fbs, 0, 1);
        check_int(&mut violations, "restecg", self.restecg, 0, 2);
        check_float(&mut violations, "thalach", self.thalach, 50.0, 250.0);
        check_int(&mut violations, "exang", self.exang, 0, 1);
        check_float(&mut violations, "oldpeak", self.oldpeak, 0.0, 10.0);
        check_int(&mut violations, "slope", self.slope, 0, 2);
        check_int(&mut violations, "ca", self.ca, 0, 4);
        check_int(&mut violations, "thal", self.thal, 0, 3);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(HeartmlError::Validation(violations.join("; ")))
        }
    }

    /// Single-row frame in the columnar form the preprocessor expects.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let df = df!(
            "age" => [self.age as f64],
            "sex" => [self.sex as f64],
            "cp" => [self.cp as f64],
            "trestbps" => [self.trestbps],
            "chol" => [self.chol],
            "fbs" => [self.fbs as f64],
            "restecg" => [self.restecg as f64],
            "thalach" => [self.thalach],
            "exang" => [self.exang as f64],
            "oldpeak" => [self.oldpeak],
            "slope" => [self.slope as f64],
            "ca" => [self.ca as f64],
            "thal" => [self.thal as f64]
        )?;
        Ok(df)
    }
}

fn check_int(violations: &mut Vec<String>, field: &str, value: i64, min: i64, max: i64) {
    if value < min || value > max {
        violations.push(format!("{field} must be between {min} and {max}, got {value}"));
    }
}

fn check_float(violations: &mut Vec<String>, field: &str, value: f64, min: f64, max: f64) {
    if !value.is_finite() || value < min || value > max {
        violations.push(format!("{field} must be between {min} and {max}, got {value}"));
    }
}

/// The model half of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelKind {
    Logistic(LogisticRegression),
    Forest(RandomForest),
}

impl ModelKind {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            ModelKind::Logistic(model) => model.fit(x, y).map(|_| ()),
            ModelKind::Forest(model) => model.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ModelKind::Logistic(model) => model.predict_proba(x),
            ModelKind::Forest(model) => model.predict_proba(x),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ModelKind::Logistic(model) => {
                format!("logistic regression (max_iter {})", model.max_iter)
            }
            ModelKind::Forest(model) => {
                format!("random forest ({} trees)", model.n_estimators)
            }
        }
    }
}

/// Preprocessor and model composed in fit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Candidate name this pipeline was built from, e.g. "logreg".
    pub name: String,
    preprocessor: Preprocessor,
    model: ModelKind,
    is_fitted: bool,
}

impl Pipeline {
    /// Compose an unfit pipeline.
    pub fn new(name: impl Into<String>, preprocessor: Preprocessor, model: ModelKind) -> Self {
        Self {
            name: name.into(),
            preprocessor,
            model,
            is_fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn model(&self) -> &ModelKind {
        &self.model
    }

    /// Fit the preprocessor on `x`, then the model on the transformed
    /// matrix. A pipeline fits exactly once; refitting means composing a
    /// fresh pipeline.
    pub fn fit(&mut self, x: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(HeartmlError::Training(
                "pipeline is already fitted".to_string(),
            ));
        }
        self.preprocessor.fit(x)?;
        let matrix = self.preprocessor.to_matrix(x)?;
        self.model.fit(&matrix, y)?;
        self.is_fitted = true;
        Ok(self)
    }

    /// Positive-class probability for every row of a feature frame.
    pub fn predict_proba_frame(&self, x: &DataFrame) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }
        let matrix = self.preprocessor.to_matrix(x)?;
        self.model.predict_proba(&matrix)
    }

    /// Positive-class probability for a single record, in [0, 1].
    pub fn predict_probability(&self, record: &Record) -> Result<f64> {
        let df = record.to_dataframe()?;
        let proba = self.predict_proba_frame(&df)?;
        proba
            .first()
            .copied()
            .ok_or_else(|| HeartmlError::Data("empty probability output".to_string()))
    }

    /// Thresholded class and probability for a single record.
    pub fn predict_one(&self, record: &Record) -> Result<(i64, f64)> {
        let probability = self.predict_probability(record)?;
        let prediction = if probability >= crate::training::DECISION_THRESHOLD {
            1
        } else {
            0
        };
        Ok((prediction, probability))
    }

    /// Persist as pretty JSON, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), model = %self.model.describe(), "pipeline saved");
        Ok(())
    }

    /// Load a persisted pipeline artifact.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| HeartmlError::Data(format!("cannot read {}: {e}", path.display())))?;
        let pipeline: Pipeline = serde_json::from_str(&json)?;
        tracing::info!(path = %path.display(), name = %pipeline.name, "pipeline loaded");
        Ok(pipeline)
    }
}
