//! Route definitions for categories, mounted at `/category`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::category;
use crate::state::AppState;

/// ```text
/// POST   /v1/category        -> create_category (admin)
/// GET    /v1/categories      -> list_categories
/// GET    /v1/category/{id}   -> get_category
/// PUT    /v1/category/{id}   -> update_category (admin)
/// DELETE /v1/category/{id}   -> delete_category (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/category", post(category::create_category))
        .route("/v1/categories", get(category::list_categories))
        .route(
            "/v1/category/{id}",
            get(category::get_category)
                .put(category::update_category)
                .delete(category::delete_category),
        )
}
