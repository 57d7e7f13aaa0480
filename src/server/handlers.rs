//! HTTP request handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use tracing::info;

use crate::pipeline::Record;

use super::error::Result;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: i64,
    pub probability: f64,
    pub model_path: String,
}

/// Score one record. Validation happens before anything touches the
/// model or the metrics, so invalid requests leave no counter trace.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(record): Json<Record>,
) -> Result<Json<PredictResponse>> {
    record.validate()?;
    let pipeline = state.pipeline()?;

    let start = Instant::now();
    let (prediction, probability) = pipeline.predict_one(&record)?;
    let latency = start.elapsed().as_secs_f64();
    state.metrics.record(latency, prediction == 1);

    info!(
        prediction,
        probability,
        latency_ms = latency * 1000.0,
        input = ?record,
        "prediction served"
    );

    Ok(Json(PredictResponse {
        prediction,
        probability,
        model_path: state.model_path.clone(),
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model_loaded(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
