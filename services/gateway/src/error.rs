use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use types::errors::CoreError;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Core(CoreError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string(), "VALIDATION_ERROR")
            }
            AppError::Core(CoreError::Capacity(e)) => {
                (StatusCode::CONFLICT, e.to_string(), "CAPACITY_EXCEEDED")
            }
            AppError::Core(CoreError::TransientStore(e)) => {
                tracing::warn!(error = %e, "Ledger store error surfaced to client");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string(), "STORE_UNAVAILABLE")
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
        };

        let body = Json(json!({
            "error": code,
            "message": error_message
        }));

        (status, body).into_response()
    }
}
