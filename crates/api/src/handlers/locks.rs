//! Handlers for the `/locks` resource.
//!
//! Responses flatten the owner to a username and carry a display-formatted
//! modification date next to the RFC 3339 timestamp.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use fritter_core::display::format_display_date;
use fritter_core::error::CoreError;
use fritter_core::legacy::normalize_remaining;
use fritter_core::lock::{parse_remaining, validate_lock_type, validate_remaining, Budget};
use fritter_core::types::{DbId, Timestamp};
use fritter_db::models::lock::{CreateLock, ImportLock, Lock, UpdateLock};
use fritter_db::repositories::LockRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::users::ensure_user_exists;
use crate::query::OwnerFilter;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response and request types
// ---------------------------------------------------------------------------

/// A lock as presented to clients.
#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub id: DbId,
    pub owner_id: DbId,
    pub owner: String,
    pub lock_type: String,
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
    pub last_modified: Timestamp,
    pub last_modified_display: String,
}

impl From<Lock> for LockResponse {
    fn from(lock: Lock) -> Self {
        Self {
            last_modified_display: format_display_date(lock.last_modified),
            id: lock.id,
            owner_id: lock.owner_id,
            owner: lock.owner,
            lock_type: lock.lock_type,
            browse_time_remaining: lock.browse_time_remaining,
            activity_time_remaining: lock.activity_time_remaining,
            last_modified: lock.last_modified,
        }
    }
}

/// A remaining-time value as sent by clients: a JSON number or numeric text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Number(f64),
    Text(String),
}

impl TimeInput {
    /// Validate into a finite, non-negative number of seconds.
    pub fn resolve(&self, budget: Budget) -> Result<f64, CoreError> {
        match self {
            Self::Number(value) => validate_remaining(*value, budget.field_name()),
            Self::Text(raw) => parse_remaining(raw, budget.field_name()),
        }
    }
}

/// Body of `PUT /locks/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateLockRequest {
    pub browse_time_remaining: TimeInput,
    pub activity_time_remaining: TimeInput,
    #[serde(default)]
    pub lock_type: Option<String>,
}

impl UpdateLockRequest {
    /// Validate every field before anything touches the database.
    pub fn validate(&self) -> Result<UpdateLock, CoreError> {
        if let Some(lock_type) = &self.lock_type {
            validate_lock_type(lock_type)?;
        }
        Ok(UpdateLock {
            browse_time_remaining: self.browse_time_remaining.resolve(Budget::Browse)?,
            activity_time_remaining: self.activity_time_remaining.resolve(Budget::Activity)?,
            lock_type: self.lock_type.clone(),
        })
    }
}

/// Body of `POST /locks/import`. Budgets are legacy free text.
#[derive(Debug, Deserialize)]
pub struct ImportLockRequest {
    pub owner_id: DbId,
    pub lock_type: String,
    #[serde(default)]
    pub browse_time_remaining: Option<String>,
    #[serde(default)]
    pub activity_time_remaining: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/locks
///
/// All locks, most recently modified first, or only the owner's lock when
/// `?owner_id=` is given.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<OwnerFilter>,
) -> AppResult<Json<DataResponse<Vec<LockResponse>>>> {
    let locks = match filter.owner_id {
        Some(owner_id) => LockRepo::list_by_owner(&state.pool, owner_id).await?,
        None => LockRepo::list_all(&state.pool).await?,
    };
    Ok(Json(DataResponse {
        data: locks.into_iter().map(LockResponse::from).collect(),
    }))
}

/// POST /api/v1/locks
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateLock>,
) -> AppResult<(StatusCode, Json<DataResponse<LockResponse>>)> {
    validate_lock_type(&input.lock_type)?;
    ensure_user_exists(&state.pool, input.owner_id).await?;

    let lock = LockRepo::create(&state.pool, &input).await?;

    tracing::info!(
        lock_id = lock.id,
        owner_id = lock.owner_id,
        lock_type = %lock.lock_type,
        "Lock created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: LockResponse::from(lock),
        }),
    ))
}

/// POST /api/v1/locks/import
///
/// Carry a lock over from the legacy store. Unparseable budgets are replaced
/// by their defaults rather than rejected.
pub async fn import(
    State(state): State<AppState>,
    Json(input): Json<ImportLockRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<LockResponse>>)> {
    validate_lock_type(&input.lock_type)?;
    ensure_user_exists(&state.pool, input.owner_id).await?;

    let remaining = normalize_remaining(
        input.browse_time_remaining.as_deref().unwrap_or_default(),
        input.activity_time_remaining.as_deref().unwrap_or_default(),
    );
    let dto = ImportLock {
        owner_id: input.owner_id,
        lock_type: input.lock_type,
        remaining,
    };
    let lock = LockRepo::import(&state.pool, &dto).await?;

    tracing::info!(
        lock_id = lock.id,
        owner_id = lock.owner_id,
        browse = lock.browse_time_remaining,
        activity = lock.activity_time_remaining,
        "Legacy lock imported",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: LockResponse::from(lock),
        }),
    ))
}

/// GET /api/v1/locks/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LockResponse>>> {
    let lock = LockRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Lock", id }))?;
    Ok(Json(DataResponse {
        data: LockResponse::from(lock),
    }))
}

/// PUT /api/v1/locks/{id}
///
/// Owner edit of both budgets and optionally the lock type.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateLockRequest>,
) -> AppResult<Json<DataResponse<LockResponse>>> {
    let dto = input.validate()?;

    let lock = LockRepo::update(&state.pool, id, &dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Lock", id }))?;

    tracing::info!(
        lock_id = id,
        browse = lock.browse_time_remaining,
        activity = lock.activity_time_remaining,
        "Lock updated",
    );

    Ok(Json(DataResponse {
        data: LockResponse::from(lock),
    }))
}

/// DELETE /api/v1/locks/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<DbId>) -> AppResult<StatusCode> {
    let lock = LockRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Lock", id }))?;

    if !LockRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "Lock", id }));
    }
    state.decay_engine.forget(lock.owner_id).await;

    tracing::info!(lock_id = id, owner_id = lock.owner_id, "Lock deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn request(body: serde_json::Value) -> UpdateLockRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_numbers_and_numeric_text() {
        let dto = request(serde_json::json!({
            "browse_time_remaining": 3500,
            "activity_time_remaining": "1199.5",
        }))
        .validate()
        .unwrap();
        assert_eq!(dto.browse_time_remaining, 3500.0);
        assert_eq!(dto.activity_time_remaining, 1199.5);
        assert!(dto.lock_type.is_none());
    }

    #[test]
    fn rejects_non_numeric_text() {
        let result = request(serde_json::json!({
            "browse_time_remaining": "lots",
            "activity_time_remaining": 10,
        }))
        .validate();
        assert_matches!(result, Err(CoreError::Validation(msg)) if msg.contains("browse_time_remaining"));
    }

    #[test]
    fn rejects_negative_numbers() {
        let result = request(serde_json::json!({
            "browse_time_remaining": 10,
            "activity_time_remaining": -3,
        }))
        .validate();
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn rejects_blank_lock_type() {
        let result = request(serde_json::json!({
            "browse_time_remaining": 10,
            "activity_time_remaining": 10,
            "lock_type": " ",
        }))
        .validate();
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn response_formats_display_date() {
        use chrono::TimeZone;
        let ts = chrono::Utc.with_ymd_and_hms(2024, 3, 3, 16, 5, 9).unwrap();
        let response = LockResponse::from(Lock {
            id: 1,
            owner_id: 2,
            owner: "u1".to_string(),
            lock_type: "screen".to_string(),
            browse_time_remaining: 3600.0,
            activity_time_remaining: 1200.0,
            last_modified: ts,
        });
        assert_eq!(response.owner, "u1");
        assert_eq!(response.last_modified_display, "March 3rd 2024, 4:05:09 pm");
    }
}
