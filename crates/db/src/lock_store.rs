//! PostgreSQL-backed [`LockStore`] for the decay engine.

use async_trait::async_trait;
use fritter_core::store::{LockState, LockStore, StoreError};
use fritter_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::repositories::LockRepo;

/// Adapts [`LockRepo`] to the engine's storage seam.
#[derive(Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Lock store query failed");
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn find_by_owner(&self, owner_id: DbId) -> Result<Option<LockState>, StoreError> {
        let lock = LockRepo::find_by_owner(&self.pool, owner_id)
            .await
            .map_err(backend)?;
        Ok(lock.map(LockState::from))
    }

    async fn update_remaining(
        &self,
        lock_id: DbId,
        expected_modified: Timestamp,
        browse: f64,
        activity: f64,
    ) -> Result<LockState, StoreError> {
        let updated =
            LockRepo::update_remaining(&self.pool, lock_id, expected_modified, browse, activity)
                .await
                .map_err(backend)?;
        if let Some(lock) = updated {
            return Ok(LockState::from(lock));
        }

        // Nothing matched: either the row is gone or it moved past the
        // version the caller read.
        match LockRepo::find_by_id(&self.pool, lock_id)
            .await
            .map_err(backend)?
        {
            Some(_) => Err(StoreError::Stale(lock_id)),
            None => Err(StoreError::NotFound(lock_id)),
        }
    }
}
