//! Error types for shelf-import
//!
//! [`PipelineError`] covers misuse of the import pipeline and structural
//! rejections; [`ApiError`] maps everything onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::PipelineStage;
use crate::services::csv_reader::StructuralError;

/// Import pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Operation is not available in the current stage
    #[error("'{operation}' is not allowed in stage '{stage}'")]
    InvalidState {
        operation: &'static str,
        stage: PipelineStage,
    },

    /// Uploaded file rejected before any row was validated
    #[error(transparent)]
    Rejected(#[from] StructuralError),

    /// Confirm requested with zero valid rows
    #[error("Keine gueltigen Zeilen zum Importieren")]
    NothingToImport,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. import already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline usage or rejection
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// shelf-common error
    #[error("Common error: {0}")]
    Common(#[from] shelf_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Pipeline(ref err) => match err {
                PipelineError::Rejected(_) => (StatusCode::BAD_REQUEST, "REJECTED", err.to_string()),
                PipelineError::InvalidState { .. } | PipelineError::NothingToImport => {
                    (StatusCode::CONFLICT, "CONFLICT", err.to_string())
                }
            },
            ApiError::Common(ref err) => match err {
                shelf_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                shelf_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string()),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
