//! Application state shared across handlers

use std::sync::Arc;
use std::time::Instant;

use crate::monitoring::PredictionMetrics;
use crate::pipeline::Pipeline;

use super::error::{Result, ServerError};

/// Shared server state.
///
/// The pipeline handle is set once before the router is built and never
/// swapped afterwards, so handlers read it without locking.
pub struct AppState {
    pipeline: Option<Arc<Pipeline>>,
    pub metrics: PredictionMetrics,
    pub model_path: String,
    pub started_at: Instant,
}

impl AppState {
    /// State with no model loaded; `/predict` answers 503.
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            pipeline: None,
            metrics: PredictionMetrics::new(),
            model_path: model_path.into(),
            started_at: Instant::now(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    pub fn model_loaded(&self) -> bool {
        self.pipeline.is_some()
    }

    /// The pipeline handle, or the 503 error when none was loaded.
    pub fn pipeline(&self) -> Result<&Arc<Pipeline>> {
        self.pipeline.as_ref().ok_or(ServerError::ModelUnavailable)
    }
}
