//! In-process lock record store.
//!
//! Implements the full record store contract (create, lookup, update, delete,
//! cascade delete) over a map keyed by lock id with a secondary owner index,
//! so per-owner uniqueness holds structurally. Write failures and slow writes
//! can be simulated to exercise the engine's alert path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{LockState, LockStore, StoreError};
use crate::error::CoreError;
use crate::lock::{validate_lock_type, Remaining};
use crate::types::{DbId, Timestamp};

/// Every write moves `last_modified` strictly forward, so it can serve as the
/// row version for conditional writes.
fn next_modified(previous: Timestamp) -> Timestamp {
    (previous + chrono::Duration::microseconds(1)).max(chrono::Utc::now())
}

#[derive(Default)]
struct Records {
    next_id: DbId,
    by_id: HashMap<DbId, LockState>,
    by_owner: HashMap<DbId, DbId>,
}

/// Lock store held entirely in memory.
#[derive(Default)]
pub struct MemoryLockStore {
    records: Mutex<Records>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the owner's lock with default budgets.
    pub async fn create(&self, owner_id: DbId, lock_type: &str) -> Result<LockState, CoreError> {
        self.insert(owner_id, lock_type, Remaining::defaults()).await
    }

    /// Create the owner's lock with explicit budgets (legacy import).
    pub async fn insert(
        &self,
        owner_id: DbId,
        lock_type: &str,
        remaining: Remaining,
    ) -> Result<LockState, CoreError> {
        validate_lock_type(lock_type)?;

        let mut records = self.records.lock().await;
        if records.by_owner.contains_key(&owner_id) {
            return Err(CoreError::Conflict(format!(
                "Owner {owner_id} already has a lock"
            )));
        }

        records.next_id += 1;
        let state = LockState {
            id: records.next_id,
            owner_id,
            lock_type: lock_type.to_string(),
            browse_time_remaining: remaining.browse,
            activity_time_remaining: remaining.activity,
            last_modified: chrono::Utc::now(),
        };
        records.by_owner.insert(owner_id, state.id);
        records.by_id.insert(state.id, state.clone());
        Ok(state)
    }

    pub async fn get_by_id(&self, lock_id: DbId) -> Result<LockState, CoreError> {
        self.records
            .lock()
            .await
            .by_id
            .get(&lock_id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "Lock",
                id: lock_id,
            })
    }

    /// Zero or one lock, since owners are unique.
    pub async fn list_by_owner(&self, owner_id: DbId) -> Vec<LockState> {
        let records = self.records.lock().await;
        records
            .by_owner
            .get(&owner_id)
            .and_then(|id| records.by_id.get(id))
            .cloned()
            .into_iter()
            .collect()
    }

    /// Owner edit: overwrite both budgets unconditionally.
    pub async fn update(
        &self,
        lock_id: DbId,
        browse: f64,
        activity: f64,
    ) -> Result<LockState, CoreError> {
        let mut records = self.records.lock().await;
        let state = records.by_id.get_mut(&lock_id).ok_or(CoreError::NotFound {
            entity: "Lock",
            id: lock_id,
        })?;
        state.browse_time_remaining = browse;
        state.activity_time_remaining = activity;
        state.last_modified = next_modified(state.last_modified);
        Ok(state.clone())
    }

    /// Remove a lock. Returns whether it existed.
    pub async fn delete(&self, lock_id: DbId) -> bool {
        let mut records = self.records.lock().await;
        match records.by_id.remove(&lock_id) {
            Some(state) => {
                records.by_owner.remove(&state.owner_id);
                true
            }
            None => false,
        }
    }

    /// Remove every lock belonging to `owner_id`.
    pub async fn delete_by_owner(&self, owner_id: DbId) {
        let mut records = self.records.lock().await;
        if let Some(id) = records.by_owner.remove(&owner_id) {
            records.by_id.remove(&id);
        }
    }

    /// Number of successful decay writes so far.
    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent decay writes fail with a backend error.
    #[cfg(test)]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every decay write by `delay` before applying it.
    #[cfg(test)]
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn find_by_owner(&self, owner_id: DbId) -> Result<Option<LockState>, StoreError> {
        Ok(self.list_by_owner(owner_id).await.into_iter().next())
    }

    async fn update_remaining(
        &self,
        lock_id: DbId,
        expected_modified: Timestamp,
        browse: f64,
        activity: f64,
    ) -> Result<LockState, StoreError> {
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection refused".to_string()));
        }

        let mut records = self.records.lock().await;
        let state = records
            .by_id
            .get_mut(&lock_id)
            .ok_or(StoreError::NotFound(lock_id))?;
        if state.last_modified != expected_modified {
            return Err(StoreError::Stale(lock_id));
        }
        state.browse_time_remaining = browse;
        state.activity_time_remaining = activity;
        state.last_modified = next_modified(state.last_modified);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(state.clone())
    }
}
