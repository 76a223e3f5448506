//! Handlers for owner-scoped lock endpoints under `/owners/{owner_id}/lock`.
//!
//! This is the surface client pollers talk to: fetch the owner's lock, check
//! whether it is active, and report elapsed time for decay.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use fritter_core::engine::DecayOutcome;
use fritter_core::error::CoreError;
use fritter_core::lock::{Budget, LockStatus};
use fritter_core::types::DbId;
use fritter_db::repositories::LockRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::locks::LockResponse;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `POST /owners/{owner_id}/lock/elapsed`.
#[derive(Debug, Deserialize)]
pub struct ElapsedReport {
    pub elapsed_secs: f64,
    #[serde(default)]
    pub budget: Budget,
}

/// GET /api/v1/owners/{owner_id}/lock
///
/// `data` is `null` when the owner has no lock.
pub async fn get_lock(
    State(state): State<AppState>,
    Path(owner_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Option<LockResponse>>>> {
    let lock = LockRepo::find_by_owner(&state.pool, owner_id).await?;
    Ok(Json(DataResponse {
        data: lock.map(LockResponse::from),
    }))
}

/// DELETE /api/v1/owners/{owner_id}/lock
///
/// Bulk delete; succeeds whether or not a lock existed.
pub async fn delete_lock(
    State(state): State<AppState>,
    Path(owner_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let removed = LockRepo::delete_by_owner(&state.pool, owner_id).await?;
    state.decay_engine.forget(owner_id).await;

    tracing::info!(owner_id, removed, "Owner locks deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/owners/{owner_id}/lock/status
pub async fn lock_status(
    State(state): State<AppState>,
    Path(owner_id): Path<DbId>,
) -> AppResult<Json<DataResponse<LockStatus>>> {
    let lock = LockRepo::find_by_owner(&state.pool, owner_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Lock for owner",
            id: owner_id,
        }))?;
    Ok(Json(DataResponse {
        data: LockStatus::from(lock.remaining()),
    }))
}

/// POST /api/v1/owners/{owner_id}/lock/elapsed
///
/// Decay one budget. A failed write still answers 200 with `persisted: false`
/// and an `alert` for the session to display.
pub async fn report_elapsed(
    State(state): State<AppState>,
    Path(owner_id): Path<DbId>,
    Json(report): Json<ElapsedReport>,
) -> AppResult<Json<DataResponse<DecayOutcome>>> {
    let outcome = state
        .decay_engine
        .apply(owner_id, report.budget, report.elapsed_secs)
        .await?;

    tracing::debug!(
        owner_id,
        budget = ?report.budget,
        elapsed_secs = report.elapsed_secs,
        persisted = outcome.persisted,
        locked = outcome.locked,
        "Elapsed time applied",
    );

    Ok(Json(DataResponse { data: outcome }))
}
