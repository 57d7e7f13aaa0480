//! Dataset loading, schema validation and cleaning
//!
//! The raw heart disease CSV carries missing-value sentinels (`"?"`, `"NA"`,
//! `"NaN"`, empty strings) and a multi-class `target` column. Cleaning
//! normalizes sentinels to nulls, imputes per column (median for numeric,
//! mode for categorical) and collapses the label to {0, 1}.

pub mod download;

use crate::error::{HeartmlError, Result};
use crate::features::FeatureSpec;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Columns every conforming dataset must carry, in file order.
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal", "target",
];

/// Raw values treated as missing before imputation.
const MISSING_SENTINELS: [&str; 4] = ["?", "NA", "NaN", ""];

/// Load a CSV file into a DataFrame.
///
/// Schema inference scans the whole file so that sentinel strings demote a
/// column to String instead of failing the parse partway through.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| HeartmlError::Data(format!("cannot open {}: {e}", path.display())))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(file)
        .finish()?;

    tracing::info!(rows = df.height(), cols = df.width(), path = %path.display(), "loaded dataset");
    Ok(df)
}

/// Check that every required column is present.
pub fn validate_schema(df: &DataFrame) -> Result<()> {
    let present: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.as_str())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !present.contains(*col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(HeartmlError::missing_columns(missing))
    }
}

/// Load a CSV and fail with a schema error if required columns are absent.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<DataFrame> {
    let df = load_csv(path)?;
    validate_schema(&df)?;
    Ok(df)
}

/// Clean a dataset without mutating the input.
///
/// Per column, in order: normalize missing-value sentinels, impute (median
/// for numeric columns and the label, mode for everything else), and
/// binarize the label (any value above zero becomes 1). Every output column
/// is Float64. A column with no usable values at all is a data quality
/// error, never a silent default.
pub fn clean(df: &DataFrame, spec: &FeatureSpec) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let name = col.name();
        let raw = extract_values(col.as_materialized_series())?;

        let filled: Vec<f64> = if name.as_str() == spec.target_col() {
            let median = median_of(&raw).ok_or_else(|| no_usable_values(name.as_str()))?;
            raw.iter()
                .map(|v| v.unwrap_or(median))
                .map(|v| if v > 0.0 { 1.0 } else { 0.0 })
                .collect()
        } else if spec.numeric_cols().iter().any(|c| c == name.as_str()) {
            let median = median_of(&raw).ok_or_else(|| no_usable_values(name.as_str()))?;
            raw.iter().map(|v| v.unwrap_or(median)).collect()
        } else {
            let mode = mode_of(&raw).ok_or_else(|| no_usable_values(name.as_str()))?;
            raw.iter().map(|v| v.unwrap_or(mode)).collect()
        };

        columns.push(Series::new(name.clone(), &filled).into());
    }

    let cleaned = DataFrame::new(columns)?;
    tracing::debug!(rows = cleaned.height(), "dataset cleaned");
    Ok(cleaned)
}

/// Total missing entries in the frame: nulls, non-finite floats, and in
/// String columns any sentinel or unparseable value.
pub fn count_missing(df: &DataFrame) -> usize {
    df.get_columns()
        .iter()
        .map(|col| {
            let series = col.as_materialized_series();
            match series.dtype() {
                DataType::String => match series.str() {
                    Ok(ca) => ca
                        .into_iter()
                        .filter(|opt| match opt {
                            None => true,
                            Some(s) => {
                                let trimmed = s.trim();
                                MISSING_SENTINELS.contains(&trimmed)
                                    || !trimmed.parse::<f64>().is_ok_and(|v| v.is_finite())
                            }
                        })
                        .count(),
                    Err(_) => series.null_count(),
                },
                _ => {
                    let mut n = series.null_count();
                    if let Ok(ca) = series.f64() {
                        n += ca.into_iter().flatten().filter(|v| !v.is_finite()).count();
                    }
                    n
                }
            }
        })
        .sum()
}

/// Write a DataFrame out as CSV, creating parent directories as needed.
pub fn write_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df.clone())?;
    tracing::info!(path = %path.display(), rows = df.height(), "wrote csv");
    Ok(())
}

/// Plain-text exploratory summary: shape, per-column missing counts and
/// basic numeric statistics.
pub fn eda_summary(df: &DataFrame) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("rows: {}\n", df.height()));
    out.push_str(&format!("cols: {}\n\n", df.width()));

    out.push_str("missing per column:\n");
    for col in df.get_columns() {
        let raw = extract_values(col.as_materialized_series())?;
        let missing = raw.iter().filter(|v| v.is_none()).count();
        out.push_str(&format!("  {}: {}\n", col.name(), missing));
    }

    out.push_str("\ndescribe:\n");
    out.push_str(&format!(
        "  {:<10} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "column", "count", "mean", "std", "min", "median", "max"
    ));
    for col in df.get_columns() {
        let raw = extract_values(col.as_materialized_series())?;
        let values: Vec<f64> = raw.iter().flatten().copied().collect();
        if values.is_empty() {
            continue;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let median = median_of(&raw).unwrap_or(f64::NAN);
        out.push_str(&format!(
            "  {:<10} {:>6} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3}\n",
            col.name(),
            values.len(),
            mean,
            std,
            min,
            median,
            max
        ));
    }

    Ok(out)
}

/// Normalize one column to `Option<f64>` values: sentinels and unparseable
/// strings become None, as do nulls and non-finite floats.
fn extract_values(series: &Series) -> Result<Vec<Option<f64>>> {
    match series.dtype() {
        DataType::String => {
            let ca = series.str().map_err(|e| HeartmlError::Data(e.to_string()))?;
            Ok(ca
                .into_iter()
                .map(|opt| {
                    opt.and_then(|s| {
                        let trimmed = s.trim();
                        if MISSING_SENTINELS.contains(&trimmed) {
                            None
                        } else {
                            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
                        }
                    })
                })
                .collect())
        }
        _ => {
            let casted = series.cast(&DataType::Float64).map_err(|_| {
                HeartmlError::Data(format!("column {} is not numeric", series.name()))
            })?;
            let ca = casted.f64().map_err(|e| HeartmlError::Data(e.to_string()))?;
            Ok(ca
                .into_iter()
                .map(|opt| opt.filter(|v| v.is_finite()))
                .collect())
        }
    }
}

fn no_usable_values(column: &str) -> HeartmlError {
    HeartmlError::DataQuality(format!(
        "column '{column}' has no usable values to impute from"
    ))
}

/// Median over the non-missing values. None if every value is missing.
fn median_of(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent non-missing value. Ties keep the value encountered first
/// in column order.
fn mode_of(values: &[Option<f64>]) -> Option<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for v in values.iter().flatten() {
        match counts.iter_mut().find(|(value, _)| value == v) {
            Some((_, count)) => *count += 1,
            None => counts.push((*v, 1)),
        }
    }

    let mut best: Option<(f64, usize)> = None;
    for (value, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirty_df() -> DataFrame {
        df!(
            "age" => &["63", "?", "41"],
            "sex" => &["1", "0", "NA"],
            "target" => &["4", "0", "1"]
        )
        .unwrap()
    }

    #[test]
    fn clean_fills_all_missing_values() {
        let spec = FeatureSpec::default();
        let cleaned = clean(&dirty_df(), &spec).unwrap();
        assert_eq!(count_missing(&cleaned), 0);

        // "?" in age imputed with the median of 63 and 41
        let ages: Vec<f64> = cleaned
            .column("age")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ages, vec![63.0, 52.0, 41.0]);
    }

    #[test]
    fn clean_binarizes_target() {
        let spec = FeatureSpec::default();
        let cleaned = clean(&dirty_df(), &spec).unwrap();
        let targets: Vec<f64> = cleaned
            .column("target")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(targets, vec![1.0, 0.0, 1.0]);
        assert!(targets.iter().all(|t| *t == 0.0 || *t == 1.0));
    }

    #[test]
    fn clean_is_idempotent() {
        let spec = FeatureSpec::default();
        let once = clean(&dirty_df(), &spec).unwrap();
        let twice = clean(&once, &spec).unwrap();
        assert!(once.equals(&twice));
    }

    #[test]
    fn clean_does_not_mutate_input() {
        let spec = FeatureSpec::default();
        let df = dirty_df();
        let _ = clean(&df, &spec).unwrap();
        let raw: Vec<Option<&str>> = df.column("age").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(raw[1], Some("?"));
    }

    #[test]
    fn clean_rejects_all_missing_column() {
        let spec = FeatureSpec::default();
        let df = df!(
            "age" => &["?", "NA", ""],
            "target" => &["1", "0", "1"]
        )
        .unwrap();
        let err = clean(&df, &spec).unwrap_err();
        assert!(matches!(err, HeartmlError::DataQuality(_)));
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn count_missing_sees_sentinels_in_string_columns() {
        // "?" in age, "NA" in sex
        assert_eq!(count_missing(&dirty_df()), 2);
    }

    #[test]
    fn mode_tie_break_keeps_first_encountered() {
        // 2.0 and 1.0 both appear twice; 2.0 was seen first
        let values = vec![Some(2.0), Some(1.0), Some(1.0), Some(2.0), None];
        assert_eq!(mode_of(&values), Some(2.0));
    }

    #[test]
    fn median_interpolates_even_counts() {
        let values = vec![Some(1.0), Some(3.0), None, Some(2.0), Some(10.0)];
        assert_eq!(median_of(&values), Some(2.5));
    }

    #[test]
    fn validate_schema_lists_missing_columns() {
        let df = df!("age" => &[63.0]).unwrap();
        let err = validate_schema(&df).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("thal"));
        assert!(msg.contains("target"));
        assert!(!msg.contains("age,"));
    }

    #[test]
    fn eda_summary_reports_shape_and_missing() {
        let summary = eda_summary(&dirty_df()).unwrap();
        assert!(summary.contains("rows: 3"));
        assert!(summary.contains("age: 1"));
        assert!(summary.contains("sex: 1"));
    }
}
