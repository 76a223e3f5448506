use axum::routing::{get, post};
use axum::Router;

use crate::handlers::owners;
use crate::state::AppState;

/// Owner-scoped lock routes mounted at `/owners`.
///
/// ```text
/// GET    /{owner_id}/lock            -> get_lock
/// DELETE /{owner_id}/lock            -> delete_lock
/// GET    /{owner_id}/lock/status     -> lock_status
/// POST   /{owner_id}/lock/elapsed    -> report_elapsed
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{owner_id}/lock",
            get(owners::get_lock).delete(owners::delete_lock),
        )
        .route("/{owner_id}/lock/status", get(owners::lock_status))
        .route("/{owner_id}/lock/elapsed", post(owners::report_elapsed))
}
