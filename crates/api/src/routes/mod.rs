pub mod health;
pub mod locks;
pub mod owners;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users                                 create
/// /users/{id}                            get, delete (cascades to lock)
///
/// /locks                                 list (?owner_id=), create
/// /locks/import                          legacy import (POST)
/// /locks/{id}                            get, update, delete
///
/// /owners/{owner_id}/lock                get (zero or one), delete
/// /owners/{owner_id}/lock/status         activation status (GET)
/// /owners/{owner_id}/lock/elapsed        decay report (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/locks", locks::router())
        .nest("/owners", owners::router())
}
