//! Category endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use posterboard_db::models::category::CategoryInput;

use super::json_body;
use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /category/v1/category
pub async fn create_category(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let input = json_body(body)?;
    let category = state.categories.create(&input).await?;
    tracing::debug!(category_id = %category.id, user_id = %admin.user_id, "Create category handled");

    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        "Category created successfully",
        category,
    ))
}

/// GET /category/v1/categories
pub async fn list_categories(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = state.categories.list().await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Categories retrieved successfully",
        categories,
    ))
}

/// GET /category/v1/category/{id}
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let category = state.categories.get_by_id(&id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Category found successfully",
        category,
    ))
}

/// PUT /category/v1/category/{id}
pub async fn update_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<CategoryInput>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let input = json_body(body)?;
    let category = state.categories.update(&id, &input).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Category updated successfully",
        category,
    ))
}

/// DELETE /category/v1/category/{id}
///
/// Refused with 409 while posters still reference the category.
pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.categories.delete(&id).await?;
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Category deleted successfully",
    ))
}
