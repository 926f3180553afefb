//! Poster endpoints.
//!
//! Create and update take a multipart form with a `categoryId` field and an
//! `image` file. The image is stored while the form is read; from then on
//! the poster service owns it and removes it if the operation fails.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::error::AppResult;
use crate::middleware::rbac::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::upload::read_poster_form;

/// POST /poster/v1/poster
pub async fn create_poster(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_poster_form(
        multipart,
        state.artifacts.as_ref(),
        state.config.max_upload_bytes,
    )
    .await?;
    let poster = state.posters.create(&form.input, form.image).await?;

    Ok(ApiResponse::ok(
        StatusCode::CREATED,
        "Poster created successfully",
        poster,
    ))
}

/// GET /poster/v1/posters
pub async fn list_posters(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let posters = state.posters.list().await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Posters retrieved successfully",
        posters,
    ))
}

/// GET /poster/v1/poster/{id}
pub async fn get_poster(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let poster = state.posters.get_by_id(&id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Poster found successfully",
        poster,
    ))
}

/// PUT /poster/v1/poster/{id}
///
/// The image part is optional; without it the current image is kept.
pub async fn update_poster(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let form = read_poster_form(
        multipart,
        state.artifacts.as_ref(),
        state.config.max_upload_bytes,
    )
    .await?;
    let poster = state.posters.update(&id, &form.input, form.image).await?;

    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Poster updated successfully",
        poster,
    ))
}

/// DELETE /poster/v1/poster/{id}
pub async fn delete_poster(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.posters.delete(&id).await?;
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Poster deleted successfully",
    ))
}

/// GET /poster/v1/posters/category/{categoryId}
pub async fn list_posters_by_category_id(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let posters = state.posters.list_by_category_id(&category_id).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Posters retrieved successfully",
        posters,
    ))
}

/// GET /poster/v1/posters/category/name/{categoryName}
pub async fn list_posters_by_category_name(
    State(state): State<AppState>,
    Path(category_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let posters = state.posters.list_by_category_name(&category_name).await?;
    Ok(ApiResponse::ok(
        StatusCode::OK,
        "Posters retrieved successfully",
        posters,
    ))
}
