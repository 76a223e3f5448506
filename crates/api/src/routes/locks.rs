use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock routes mounted at `/locks`.
///
/// ```text
/// GET    /              -> list
/// POST   /              -> create
/// POST   /import        -> import
/// GET    /{id}          -> get_by_id
/// PUT    /{id}          -> update
/// DELETE /{id}          -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(locks::list).post(locks::create))
        .route("/import", post(locks::import))
        .route(
            "/{id}",
            get(locks::get_by_id)
                .put(locks::update)
                .delete(locks::delete),
        )
}
