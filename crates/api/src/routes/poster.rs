//! Route definitions for posters, mounted at `/poster`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::poster;
use crate::state::AppState;

/// ```text
/// POST   /v1/poster                                 -> create_poster (admin)
/// GET    /v1/posters                                -> list_posters
/// GET    /v1/poster/{id}                            -> get_poster
/// PUT    /v1/poster/{id}                            -> update_poster (admin)
/// DELETE /v1/poster/{id}                            -> delete_poster (admin)
/// GET    /v1/posters/category/{categoryId}          -> list_posters_by_category_id
/// GET    /v1/posters/category/name/{categoryName}   -> list_posters_by_category_name
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/poster", post(poster::create_poster))
        .route("/v1/posters", get(poster::list_posters))
        .route(
            "/v1/poster/{id}",
            get(poster::get_poster)
                .put(poster::update_poster)
                .delete(poster::delete_poster),
        )
        .route(
            "/v1/posters/category/{category_id}",
            get(poster::list_posters_by_category_id),
        )
        .route(
            "/v1/posters/category/name/{category_name}",
            get(poster::list_posters_by_category_name),
        )
}
