//! Handlers for the `/users` resource.
//!
//! Only what lock ownership needs: create, fetch, and delete (which cascades
//! to the user's lock).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fritter_core::error::CoreError;
use fritter_core::types::DbId;
use fritter_db::models::user::{CreateUser, User};
use fritter_db::repositories::UserRepo;
use fritter_db::DbPool;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Fail with 404 unless the user exists.
pub(crate) async fn ensure_user_exists(pool: &DbPool, id: DbId) -> AppResult<()> {
    UserRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(())
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    if input.username.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Username must not be empty".to_string(),
        )));
    }

    let user = UserRepo::create(&state.pool, &input).await?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: user })))
}

/// GET /api/v1/users/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(DataResponse { data: user }))
}

/// DELETE /api/v1/users/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    if !UserRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    state.decay_engine.forget(id).await;

    tracing::info!(user_id = id, "User deleted with their lock");

    Ok(StatusCode::NO_CONTENT)
}
