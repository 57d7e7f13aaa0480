//! Fitted feature transformations
//!
//! A [`Preprocessor`] pairs a standardizer for the numeric columns with a
//! one-hot encoder for the categorical columns. It is fit exactly once on
//! training data and then applied, never refit, to holdout folds and to
//! online inference input.

use crate::error::{HeartmlError, Result};
use crate::features::FeatureSpec;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Learned scaling parameters for one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleParams {
    pub mean: f64,
    pub std: f64,
}

/// Z-score scaler: (x - mean) / std per fitted column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standardizer {
    params: HashMap<String, ScaleParams>,
    is_fitted: bool,
}

impl Standardizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn mean and population std for each column. A constant column
    /// gets std 1.0 so transform leaves it centered at zero.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| HeartmlError::Data(format!("column not found: {col_name}")))?;
            let series = column.as_materialized_series();
            let params = Self::compute_params(series)?;
            self.params.insert(col_name.clone(), params);
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace every fitted column with its scaled version.
    /// Builds all replacement columns first, then applies them in one pass.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }

        let replacements: Vec<Series> = self
            .params
            .iter()
            .filter_map(|(col_name, params)| {
                df.column(col_name).ok().map(|column| {
                    let series = column.as_materialized_series();
                    Self::scale_series(series, params)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result = result.with_column(scaled)?.clone();
        }
        Ok(result)
    }

    pub fn params(&self, column: &str) -> Option<&ScaleParams> {
        self.params.get(column)
    }

    fn compute_params(series: &Series) -> Result<ScaleParams> {
        let values: Vec<f64> = Self::to_f64_values(series)?;
        if values.is_empty() {
            return Err(HeartmlError::Data(format!(
                "cannot fit scaler on empty column: {}",
                series.name()
            )));
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();

        Ok(ScaleParams {
            mean,
            std: if std == 0.0 { 1.0 } else { std },
        })
    }

    fn scale_series(series: &Series, params: &ScaleParams) -> Result<Series> {
        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64().map_err(|e| HeartmlError::Data(e.to_string()))?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.mean) / params.std))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }

    fn to_f64_values(series: &Series) -> Result<Vec<f64>> {
        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64().map_err(|e| HeartmlError::Data(e.to_string()))?;
        Ok(ca.into_iter().flatten().filter(|v| v.is_finite()).collect())
    }
}

/// One indicator column per category observed at fit time.
///
/// A value never seen during fit matches no indicator, so it encodes as an
/// all-zero block rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Per column, the sorted category values observed at fit.
    vocab: HashMap<String, Vec<f64>>,
    /// Columns in fit order, so output ordering is deterministic.
    columns: Vec<String>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.vocab.clear();
        self.columns = columns.to_vec();

        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| HeartmlError::Data(format!("column not found: {col_name}")))?;
            let casted = column.as_materialized_series().cast(&DataType::Float64)?;
            let ca = casted.f64().map_err(|e| HeartmlError::Data(e.to_string()))?;

            let mut categories: Vec<f64> = Vec::new();
            for value in ca.into_iter().flatten() {
                if value.is_finite() && !categories.iter().any(|c| *c == value) {
                    categories.push(value);
                }
            }
            if categories.is_empty() {
                return Err(HeartmlError::DataQuality(format!(
                    "no categories observed in column: {col_name}"
                )));
            }
            categories.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            self.vocab.insert(col_name.clone(), categories);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Replace each fitted column with its indicator columns.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }

        let mut result = df.clone();
        for col_name in &self.columns {
            let categories = match self.vocab.get(col_name) {
                Some(c) => c,
                None => continue,
            };
            let column = result
                .column(col_name)
                .map_err(|_| HeartmlError::Data(format!("column not found: {col_name}")))?;
            let casted = column.as_materialized_series().cast(&DataType::Float64)?;
            let ca = casted.f64().map_err(|e| HeartmlError::Data(e.to_string()))?;
            let values: Vec<Option<f64>> = ca.into_iter().collect();

            for category in categories {
                let indicator: Float64Chunked = values
                    .iter()
                    .map(|opt| match opt {
                        Some(v) if *v == *category => Some(1.0),
                        Some(_) | None => Some(0.0),
                    })
                    .collect();
                let name = indicator_name(col_name, *category);
                result = result
                    .with_column(indicator.with_name(name.into()).into_series())?
                    .clone();
            }
            result = result.drop(col_name)?;
        }
        Ok(result)
    }

    /// Indicator column names for one fitted column, in category order.
    pub fn output_columns(&self, column: &str) -> Option<Vec<String>> {
        self.vocab.get(column).map(|categories| {
            categories
                .iter()
                .map(|c| indicator_name(column, *c))
                .collect()
        })
    }
}

fn indicator_name(column: &str, category: f64) -> String {
    if category.fract() == 0.0 {
        format!("{}_{}", column, category as i64)
    } else {
        format!("{}_{}", column, category)
    }
}

/// Fitted feature transformation: scale numeric columns, one-hot encode
/// categorical columns. Owns no reference back to the data it was fit on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    spec: FeatureSpec,
    standardizer: Standardizer,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl Preprocessor {
    /// An unfit preprocessor for the given schema.
    pub fn new(spec: FeatureSpec) -> Self {
        Self {
            spec,
            standardizer: Standardizer::new(),
            encoder: OneHotEncoder::new(),
            is_fitted: false,
        }
    }

    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learn scaling parameters and category vocabularies from `df`.
    /// Must be called exactly once, on training data only.
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.check_columns(df)?;
        self.standardizer.fit(df, self.spec.numeric_cols())?;
        self.encoder.fit(df, self.spec.categorical_cols())?;
        self.is_fitted = true;
        Ok(self)
    }

    /// Apply the fitted transformation. Output column set and order are
    /// given by [`Preprocessor::output_columns`].
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }
        self.check_columns(df)?;
        let scaled = self.standardizer.transform(df)?;
        let encoded = self.encoder.transform(&scaled)?;
        Ok(encoded)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Names of the transformed feature columns: scaled numeric columns in
    /// schema order, then indicator columns per categorical column.
    pub fn output_columns(&self) -> Result<Vec<String>> {
        if !self.is_fitted {
            return Err(HeartmlError::NotFitted);
        }
        let mut cols: Vec<String> = self.spec.numeric_cols().to_vec();
        for cat in self.spec.categorical_cols() {
            if let Some(indicators) = self.encoder.output_columns(cat) {
                cols.extend(indicators);
            }
        }
        Ok(cols)
    }

    /// Transform and pack into a row-major feature matrix with a
    /// deterministic column order.
    pub fn to_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let transformed = self.transform(df)?;
        let columns = self.output_columns()?;

        let n_rows = transformed.height();
        let n_cols = columns.len();

        let col_data: Vec<Vec<f64>> = columns
            .iter()
            .map(|col_name| {
                let column = transformed
                    .column(col_name)
                    .map_err(|_| HeartmlError::Data(format!("column not found: {col_name}")))?;
                let casted = column.as_materialized_series().cast(&DataType::Float64)?;
                let values: Vec<f64> = casted
                    .f64()
                    .map_err(|e| HeartmlError::Data(e.to_string()))?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();
                Ok(values)
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            col_refs[c][r]
        }))
    }

    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        let present: Vec<&str> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.as_str())
            .collect();
        let missing: Vec<String> = self
            .spec
            .feature_cols()
            .into_iter()
            .filter(|col| !present.contains(&col.as_str()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HeartmlError::missing_columns(missing))
        }
    }
}
