//! Uniform response envelope.
//!
//! Every response, success or failure, is `{ status, success, message, data? }`.
//! `data` is omitted when there is no payload (deletes and errors).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Standard response envelope.
///
/// ```ignore
/// Ok(ApiResponse::ok(StatusCode::CREATED, "Category created successfully", category))
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn ok(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status: status.as_u16(),
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// A successful response without a payload.
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// A failure response.
    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
