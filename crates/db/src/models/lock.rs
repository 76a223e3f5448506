//! Lock models and DTOs.
//!
//! Rows are always read joined with `users` so the owner can be presented by
//! username.

use fritter_core::lock::Remaining;
use fritter_core::store::LockState;
use fritter_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Entity structs (database rows)
// ---------------------------------------------------------------------------

/// A row from the `locks` table joined with its owner's username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lock {
    pub id: DbId,
    pub owner_id: DbId,
    pub owner: String,
    pub lock_type: String,
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
    pub last_modified: Timestamp,
}

impl Lock {
    pub fn remaining(&self) -> Remaining {
        Remaining::new(self.browse_time_remaining, self.activity_time_remaining)
    }
}

impl From<Lock> for LockState {
    fn from(lock: Lock) -> Self {
        LockState {
            id: lock.id,
            owner_id: lock.owner_id,
            lock_type: lock.lock_type,
            browse_time_remaining: lock.browse_time_remaining,
            activity_time_remaining: lock.activity_time_remaining,
            last_modified: lock.last_modified,
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a lock with default budgets.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLock {
    pub owner_id: DbId,
    pub lock_type: String,
}

/// DTO for an owner edit. Budgets are already validated.
#[derive(Debug, Clone)]
pub struct UpdateLock {
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
    pub lock_type: Option<String>,
}

/// DTO for a lock carried over from the legacy store, budgets normalized.
#[derive(Debug, Clone)]
pub struct ImportLock {
    pub owner_id: DbId,
    pub lock_type: String,
    pub remaining: Remaining,
}
