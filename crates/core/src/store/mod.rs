//! Persistence seam used by the decay engine.
//!
//! The engine only needs two operations from storage: look up an owner's lock
//! and write new budgets. The PostgreSQL implementation lives in
//! `fritter_db::lock_store`; [`memory::MemoryLockStore`] is an in-process
//! implementation of the full record store.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::lock::Remaining;
use crate::types::{DbId, Timestamp};

/// Snapshot of a persisted lock as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockState {
    pub id: DbId,
    pub owner_id: DbId,
    pub lock_type: String,
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
    pub last_modified: Timestamp,
}

impl LockState {
    pub fn remaining(&self) -> Remaining {
        Remaining::new(self.browse_time_remaining, self.activity_time_remaining)
    }
}

/// Failure reported by a [`LockStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Lock {0} not found")]
    NotFound(DbId),

    /// The row changed since it was read; the write was not applied.
    #[error("Lock {0} was modified concurrently")]
    Stale(DbId),

    #[error("Lock store unavailable: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => CoreError::NotFound { entity: "Lock", id },
            StoreError::Stale(id) => {
                CoreError::Conflict(format!("Lock {id} was modified concurrently"))
            }
            StoreError::Backend(msg) => CoreError::Internal(msg),
        }
    }
}

/// Storage operations the decay engine depends on.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// The owner's lock, if one exists.
    async fn find_by_owner(&self, owner_id: DbId) -> Result<Option<LockState>, StoreError>;

    /// Overwrite both budgets and stamp `last_modified`, but only while the
    /// row's `last_modified` still equals `expected_modified`. Otherwise
    /// fails with [`StoreError::Stale`] and leaves the row untouched.
    async fn update_remaining(
        &self,
        lock_id: DbId,
        expected_modified: Timestamp,
        browse: f64,
        activity: f64,
    ) -> Result<LockState, StoreError>;
}

#[async_trait]
impl<S: LockStore + ?Sized> LockStore for Arc<S> {
    async fn find_by_owner(&self, owner_id: DbId) -> Result<Option<LockState>, StoreError> {
        (**self).find_by_owner(owner_id).await
    }

    async fn update_remaining(
        &self,
        lock_id: DbId,
        expected_modified: Timestamp,
        browse: f64,
        activity: f64,
    ) -> Result<LockState, StoreError> {
        (**self)
            .update_remaining(lock_id, expected_modified, browse, activity)
            .await
    }
}
