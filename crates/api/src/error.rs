use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use posterboard_core::artifact::StorageError;
use posterboard_core::error::CoreError;
use posterboard_db::StoreError;

use crate::response::ApiResponse;

/// Application-level error type for HTTP handlers and services.
///
/// Wraps [`CoreError`] for domain errors and adds persistence, storage and
/// HTTP-specific variants. Implements [`IntoResponse`] to produce the
/// uniform envelope with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `posterboard_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A persistence error not already translated by a service.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An artifact storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

/// Convenience type alias for handler and service return values.
pub type AppResult<T> = Result<T, AppError>;

/// Message returned for every 500; details stay in the logs.
const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    /// HTTP status and client-facing message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::NoRecords(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
                }
            },

            // --- Persistence errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- Artifact storage errors ---
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Artifact storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        ApiResponse::failure(status, message).into_response()
    }
}

/// Classify a store error into an HTTP status and message.
///
/// - Constraint violations map to 409.
/// - `RowNotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::ForeignKeyViolation { constraint } => (
            StatusCode::CONFLICT,
            format!("Operation violates reference constraint: {constraint}"),
        ),
        StoreError::UniqueViolation { constraint } => (
            StatusCode::CONFLICT,
            format!("Duplicate value violates unique constraint: {constraint}"),
        ),
        StoreError::Database(sqlx::Error::RowNotFound) => {
            (StatusCode::NOT_FOUND, "Resource not found".into())
        }
        StoreError::Database(other) => {
            tracing::error!(error = %other, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.into())
        }
    }
}
