//! Feature schema for the heart disease dataset
//!
//! Declares which columns are numeric vs categorical and provides the
//! feature/label split used by training and serving.

mod preprocessor;

pub use preprocessor::{OneHotEncoder, Preprocessor, ScaleParams, Standardizer};

use crate::error::{HeartmlError, Result};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable partition of the dataset columns.
///
/// Constructed once per run and shared by the cleaner, the preprocessor
/// and the training engine; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    numeric_cols: Vec<String>,
    categorical_cols: Vec<String>,
    target_col: String,
}

impl Default for FeatureSpec {
    /// The heart disease schema: continuous measurements are scaled,
    /// integer-coded clinical categories are one-hot encoded.
    fn default() -> Self {
        Self {
            numeric_cols: ["age", "trestbps", "chol", "thalach", "oldpeak", "ca"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categorical_cols: ["sex", "cp", "fbs", "restecg", "exang", "slope", "thal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            target_col: "target".to_string(),
        }
    }
}

impl FeatureSpec {
    pub fn new(
        numeric_cols: Vec<String>,
        categorical_cols: Vec<String>,
        target_col: impl Into<String>,
    ) -> Self {
        Self {
            numeric_cols,
            categorical_cols,
            target_col: target_col.into(),
        }
    }

    pub fn numeric_cols(&self) -> &[String] {
        &self.numeric_cols
    }

    pub fn categorical_cols(&self) -> &[String] {
        &self.categorical_cols
    }

    pub fn target_col(&self) -> &str {
        &self.target_col
    }

    /// All feature columns, numeric first, in declaration order.
    pub fn feature_cols(&self) -> Vec<String> {
        self.numeric_cols
            .iter()
            .chain(self.categorical_cols.iter())
            .cloned()
            .collect()
    }

    /// Every column a conforming dataset must carry (features + label).
    pub fn required_columns(&self) -> Vec<String> {
        let mut cols = self.feature_cols();
        cols.push(self.target_col.clone());
        cols
    }

    /// Columns from `required` that are absent from the frame.
    pub fn missing_from(&self, df: &DataFrame) -> Vec<String> {
        let present: Vec<&str> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str())
            .collect();
        self.required_columns()
            .into_iter()
            .filter(|col| !present.contains(&col.as_str()))
            .collect()
    }
}

/// Split a dataset into a feature view and an integer label vector.
///
/// The label column is dropped from the feature frame; labels are returned
/// aligned by row order. Fails if the label column is absent or holds
/// non-numeric values.
pub fn split_xy(df: &DataFrame, spec: &FeatureSpec) -> Result<(DataFrame, Array1<i64>)> {
    let missing = spec.missing_from(df);
    if !missing.is_empty() {
        return Err(HeartmlError::missing_columns(missing));
    }

    let target = df
        .column(spec.target_col())?
        .cast(&DataType::Int64)
        .map_err(|e| HeartmlError::Data(format!("label column not numeric: {e}")))?;

    let y: Array1<i64> = target
        .i64()
        .map_err(|e| HeartmlError::Data(e.to_string()))?
        .into_iter()
        .map(|v| v.ok_or_else(|| HeartmlError::Data("missing label value".to_string())))
        .collect::<Result<Vec<i64>>>()?
        .into();

    let x = df.drop(spec.target_col())?;
    Ok((x, y))
}
