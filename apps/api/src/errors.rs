use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::session::{SessionDataError, SessionStateError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Adapter (LLM) failures never appear here — the orchestrator absorbs them
/// into fallback values. What does surface: validation problems, lifecycle
/// violations, report rendering failures, and infrastructure errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Report generation failed: {0}")]
    ReportGeneration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Voice gateway error: {0}")]
    Voice(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionStateError> for AppError {
    fn from(e: SessionStateError) -> Self {
        AppError::State(e.to_string())
    }
}

impl From<SessionDataError> for AppError {
    fn from(e: SessionDataError) -> Self {
        AppError::Internal(anyhow::anyhow!("corrupt session record: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::State(msg) => (StatusCode::CONFLICT, "STATE_ERROR", msg.clone()),
            AppError::ReportGeneration(msg) => {
                tracing::error!("Report generation failed: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REPORT_GENERATION_FAILED",
                    "Report generation failed — please retry".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Voice(msg) => {
                tracing::error!("Voice gateway error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "VOICE_ERROR",
                    "An audio processing error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
