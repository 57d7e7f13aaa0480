//! Error types for the heartml pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeartmlError {
    /// Required columns are absent from the input data.
    #[error("schema validation failed, missing required columns: {}", .columns.join(", "))]
    Schema { columns: Vec<String> },

    /// A column cannot be imputed (for example, every value is missing).
    #[error("data quality error: {0}")]
    DataQuality(String),

    /// A candidate model failed to fit. Aborts the whole training run.
    #[error("training error: {0}")]
    Training(String),

    /// A prediction request violated the declared field ranges or types.
    #[error("validation error: {0}")]
    Validation(String),

    /// Prediction was requested before a model artifact was loaded.
    #[error("no model is loaded")]
    ModelUnavailable,

    /// A fitted-only operation was called before fit.
    #[error("not fitted: call fit() before transform/predict")]
    NotFitted,

    /// General data handling failure.
    #[error("data error: {0}")]
    Data(String),

    /// Array dimensions do not line up.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataframe error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeartmlError {
    /// Schema error from the set of missing column names.
    pub fn missing_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HeartmlError::Schema {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HeartmlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lists_missing_columns() {
        let err = HeartmlError::missing_columns(["thal", "ca"]);
        let msg = err.to_string();
        assert!(msg.contains("thal"));
        assert!(msg.contains("ca"));
    }

    #[test]
    fn io_error_converts() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/a/file")?)
        }
        assert!(matches!(read(), Err(HeartmlError::Io(_))));
    }
}
