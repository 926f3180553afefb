//! HTTP handlers.
//!
//! Handlers translate requests into service calls and wrap the results in
//! the [`ApiResponse`](crate::response::ApiResponse) envelope. Mutating
//! endpoints require the admin role; reads are public.

pub mod category;
pub mod poster;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppError;
use crate::response::ApiResponse;

/// Fallback for unmatched routes.
pub async fn not_found() -> impl IntoResponse {
    ApiResponse::failure(StatusCode::NOT_FOUND, "Route not found")
}

/// Unwrap a JSON body, reporting extractor rejections in the envelope.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}
