pub mod category;
pub mod health;
pub mod poster;

use axum::Router;

use crate::state::AppState;

/// Build the entity route tree.
///
/// Route hierarchy:
///
/// ```text
/// /category/v1/category                            create (admin)
/// /category/v1/categories                          list
/// /category/v1/category/{id}                       get, update, delete (admin)
///
/// /poster/v1/poster                                create (admin, multipart)
/// /poster/v1/posters                               list
/// /poster/v1/poster/{id}                           get, update, delete (admin)
/// /poster/v1/posters/category/{categoryId}         list by category id
/// /poster/v1/posters/category/name/{categoryName}  list by category name
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/category", category::router())
        .nest("/poster", poster::router())
}
