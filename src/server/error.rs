//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::HeartmlError;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("no model is loaded")]
    ModelUnavailable,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<HeartmlError> for ServerError {
    fn from(err: HeartmlError) -> Self {
        match err {
            HeartmlError::Validation(msg) => ServerError::Validation(msg),
            HeartmlError::ModelUnavailable => ServerError::ModelUnavailable,
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ServerError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "No model is loaded. Train one or point MODEL_PATH at an artifact.".to_string(),
            ),
            ServerError::Internal(msg) => {
                tracing::error!(detail = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": true,
            "message": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
