//! Structured API errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use palaver_engine::EngineError;

/// Errors surfaced to HTTP callers as `{"detail": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The engine never initialized at startup; no history is mutated.
    #[error("completion engine failed to initialize; service unavailable")]
    EngineUnavailable,

    /// Request body carried a blank prompt; no history is mutated.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// The engine failed during generation; the speculative user turn has
    /// already been rolled back by the handler.
    #[error("text generation failed: {0}")]
    Engine(#[from] EngineError),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::EngineUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::EmptyPrompt => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
