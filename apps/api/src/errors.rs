use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The model's output could not be turned into the requested record.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The scoring response lacked a usable `match_score`.
    #[error("Scoring failed: {0}")]
    Scoring(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Email dispatch failed: {0}")]
    EmailDispatch(String),

    /// Caller misuse detected before any network call, e.g. no recipients.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Usage(msg) => (StatusCode::BAD_REQUEST, "USAGE_ERROR", msg.clone()),
            AppError::Extraction(msg) => {
                tracing::warn!("Extraction error: {msg}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "EXTRACTION_FAILED",
                    msg.clone(),
                )
            }
            AppError::Scoring(msg) => {
                tracing::warn!("Scoring error: {msg}");
                (StatusCode::UNPROCESSABLE_ENTITY, "SCORING_FAILED", msg.clone())
            }
            AppError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                "INVALID_STATE_TRANSITION",
                msg.clone(),
            ),
            AppError::EmailDispatch(msg) => {
                tracing::error!("Email dispatch error: {msg}");
                (StatusCode::BAD_GATEWAY, "EMAIL_DISPATCH_FAILED", msg.clone())
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_maps_to_conflict() {
        let response = AppError::InvalidStateTransition("not shortlisted".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_usage_error_maps_to_bad_request() {
        let response = AppError::Usage("no recipients".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_error_hides_details() {
        let response = AppError::Storage(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
