//! Prediction server module
//!
//! axum HTTP service exposing a fitted pipeline: `POST /predict` scores
//! one validated record, `GET /health` reports liveness, `GET /metrics`
//! renders Prometheus counters.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::PredictResponse;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{HeartmlError, Result};
use crate::pipeline::Pipeline;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("MODEL_PATH")
                .unwrap_or_else(|_| "artifacts/model/final_pipeline.json".to_string()),
        }
    }
}

/// Start the server with the given configuration.
///
/// A missing or unreadable model artifact is not fatal: the server comes
/// up and `/predict` answers 503 until a model exists at the path.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let state = match Pipeline::load(&config.model_path) {
        Ok(pipeline) => {
            info!(path = %config.model_path, name = %pipeline.name, "model loaded");
            AppState::new(&config.model_path).with_pipeline(pipeline)
        }
        Err(e) => {
            warn!(
                path = %config.model_path,
                error = %e,
                "model not loaded, /predict will return 503"
            );
            AppState::new(&config.model_path)
        }
    };
    let app = create_router(Arc::new(state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| HeartmlError::Validation(format!("invalid listen address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "server listening");
    info!(url = %format!("http://{addr}/health"), "health endpoint");
    info!(url = %format!("http://{addr}/metrics"), "metrics endpoint");

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("failed to install ctrl+c handler");
        } else {
            info!("shutdown signal received, stopping gracefully");
        }
    };

    info!("server started (press ctrl+c to stop)");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("server shut down cleanly");
    Ok(())
}
