//! Integration test: feature preprocessing over the full heart schema

use heartml::features::{split_xy, FeatureSpec, Preprocessor};
use heartml::pipeline::Record;
use polars::prelude::*;

fn fixture_frame() -> DataFrame {
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

fn record_with_thal(thal: i64) -> Record {
    Record {
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
        thal,
    }
}

#[test]
fn transform_is_deterministic_for_identical_input() {
    let (x, _y) = split_xy(&fixture_frame(), &FeatureSpec::default()).unwrap();
    let mut pre = Preprocessor::new(FeatureSpec::default());
    pre.fit(&x).unwrap();

    let a = pre.to_matrix(&x).unwrap();
    let b = pre.to_matrix(&x).unwrap();
    assert_eq!(a, b);
}

#[test]
fn independently_fitted_preprocessors_agree() {
    let (x, _y) = split_xy(&fixture_frame(), &FeatureSpec::default()).unwrap();

    let mut first = Preprocessor::new(FeatureSpec::default());
    let mut second = Preprocessor::new(FeatureSpec::default());
    first.fit(&x).unwrap();
    second.fit(&x).unwrap();

    assert_eq!(
        first.to_matrix(&x).unwrap(),
        second.to_matrix(&x).unwrap()
    );
}

#[test]
fn unseen_category_maps_to_all_zero_indicators() {
    let (x, _y) = split_xy(&fixture_frame(), &FeatureSpec::default()).unwrap();
    let mut pre = Preprocessor::new(FeatureSpec::default());
    pre.fit(&x).unwrap();

    // thal 3 never appears at fit time; the row must still transform
    let apply = record_with_thal(3).to_dataframe().unwrap();
    let out = pre.transform(&apply).unwrap();

    for col in ["thal_1", "thal_2"] {
        let values: Vec<f64> = out
            .column(col)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(values, vec![0.0], "{col} should be zero for unseen thal");
    }
}

#[test]
fn output_columns_list_numeric_then_indicators() {
    let (x, _y) = split_xy(&fixture_frame(), &FeatureSpec::default()).unwrap();
    let mut pre = Preprocessor::new(FeatureSpec::default());
    pre.fit(&x).unwrap();

    let cols = pre.output_columns().unwrap();
    assert_eq!(
        &cols[..6],
        &["age", "trestbps", "chol", "thalach", "oldpeak", "ca"]
    );
    assert!(cols.contains(&"sex_0".to_string()));
    assert!(cols.contains(&"sex_1".to_string()));
    assert!(cols.contains(&"thal_1".to_string()));
    assert!(cols.contains(&"thal_2".to_string()));
    // matrix width matches the declared column list
    let matrix = pre.to_matrix(&x).unwrap();
    assert_eq!(matrix.ncols(), cols.len());
}
