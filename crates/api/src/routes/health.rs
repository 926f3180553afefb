use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    store: &'static str,
}

/// Reports 200 when the store answers, 503 otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.categories.ping().await {
        Ok(()) => ApiResponse::ok(
            StatusCode::OK,
            "Service is healthy",
            HealthResponse {
                status: "ok",
                version: env!("CARGO_PKG_VERSION"),
                store: "ok",
            },
        ),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            ApiResponse {
                status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
                success: false,
                message: "Store is unreachable".into(),
                data: Some(HealthResponse {
                    status: "degraded",
                    version: env!("CARGO_PKG_VERSION"),
                    store: "unreachable",
                }),
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
