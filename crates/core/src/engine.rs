//! Lock decay engine.
//!
//! Turns elapsed-time reports into budget updates. Planning is delegated to
//! [`plan_decay`]; this module owns the I/O side: reading the owner's lock,
//! executing [`LockEffect::Persist`] under a timeout, and remembering a
//! decremented value whose write failed so the next report builds on it.
//!
//! Reports for the same owner are serialized through a per-owner mutex, so
//! the read-plan-write cycle cannot interleave. Different owners proceed in
//! parallel. Owner edits do not take that mutex; instead every decay write is
//! conditional on the `last_modified` it was planned from, and a write that
//! lost to an edit is re-planned on top of it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::lock::{is_locked, plan_decay, validate_elapsed, Budget, LockEffect, Remaining};
use crate::store::{LockState, LockStore, StoreError};
use crate::types::{DbId, Timestamp};

/// Default bound on a single persistence write.
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(2);

/// How many times a write that lost to a concurrent edit is re-planned from a
/// fresh read before the report gives up with an alert.
const MAX_STALE_RETRIES: usize = 3;

/// Result of one decay report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayOutcome {
    pub lock_id: DbId,
    pub owner_id: DbId,
    pub budget: Budget,
    pub browse_time_remaining: f64,
    pub activity_time_remaining: f64,
    pub locked: bool,
    /// Whether this report wrote to the store.
    pub persisted: bool,
    /// Non-fatal write failure to surface to the reporting session.
    pub alert: Option<String>,
}

/// A decremented value that has not reached the store yet.
#[derive(Debug, Clone, Copy)]
struct PendingDecay {
    lock_id: DbId,
    /// `last_modified` of the stored row the value was derived from.
    base_modified: Timestamp,
    remaining: Remaining,
}

#[derive(Debug, Default)]
struct OwnerSlot {
    pending: Option<PendingDecay>,
}

/// Dispatcher for decay effects against a [`LockStore`].
pub struct DecayEngine<S> {
    store: S,
    persist_timeout: Duration,
    slots: Mutex<HashMap<DbId, Arc<Mutex<OwnerSlot>>>>,
}

impl<S: LockStore> DecayEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_persist_timeout(store, DEFAULT_PERSIST_TIMEOUT)
    }

    pub fn with_persist_timeout(store: S, persist_timeout: Duration) -> Self {
        Self {
            store,
            persist_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decay the owner's browse budget by `elapsed_secs`.
    pub async fn apply_elapsed(
        &self,
        owner_id: DbId,
        elapsed_secs: f64,
    ) -> Result<DecayOutcome, CoreError> {
        self.apply(owner_id, Budget::Browse, elapsed_secs).await
    }

    /// Decay the owner's activity budget by `elapsed_secs`.
    pub async fn apply_activity_elapsed(
        &self,
        owner_id: DbId,
        elapsed_secs: f64,
    ) -> Result<DecayOutcome, CoreError> {
        self.apply(owner_id, Budget::Activity, elapsed_secs).await
    }

    /// Decay one budget of the owner's lock.
    ///
    /// Fails with `Validation` for a bad elapsed value and `NotFound` when the
    /// owner has no lock; locks are never created here. A failed or timed-out
    /// write is not an error: it comes back as `alert` and the decremented
    /// value is kept and written again on the next report.
    pub async fn apply(
        &self,
        owner_id: DbId,
        budget: Budget,
        elapsed_secs: f64,
    ) -> Result<DecayOutcome, CoreError> {
        let elapsed = validate_elapsed(elapsed_secs)?;

        let slot = self.slot(owner_id).await;
        let mut guard = slot.lock().await;
        let result = self
            .apply_serialized(&mut guard, owner_id, budget, elapsed)
            .await;
        drop(guard);

        self.release(owner_id, slot).await;
        result
    }

    async fn apply_serialized(
        &self,
        slot: &mut OwnerSlot,
        owner_id: DbId,
        budget: Budget,
        elapsed: f64,
    ) -> Result<DecayOutcome, CoreError> {
        let mut stale_retries = 0;

        loop {
            let Some(stored) = self.store.find_by_owner(owner_id).await? else {
                slot.pending = None;
                return Err(CoreError::NotFound {
                    entity: "Lock for owner",
                    id: owner_id,
                });
            };

            let pending = match slot.pending.take() {
                Some(p) if p.lock_id == stored.id && p.base_modified == stored.last_modified => {
                    Some(p)
                }
                Some(_) => {
                    tracing::debug!(
                        owner_id,
                        lock_id = stored.id,
                        "Dropping unpersisted decay superseded by a newer write",
                    );
                    None
                }
                None => None,
            };
            let observed = pending.map_or_else(|| stored.remaining(), |p| p.remaining);

            let plan = plan_decay(stored.id, observed, pending.is_some(), budget, elapsed);

            let Some(effect) = plan.effect else {
                return Ok(outcome(&stored, budget, plan.next, false, None));
            };

            match self.dispatch(effect, stored.last_modified).await {
                Ok(saved) => {
                    tracing::debug!(
                        owner_id,
                        lock_id = saved.id,
                        browse = saved.browse_time_remaining,
                        activity = saved.activity_time_remaining,
                        "Lock budgets persisted",
                    );
                    return Ok(outcome(&saved, budget, saved.remaining(), true, None));
                }
                Err(StoreError::Stale(lock_id)) if stale_retries < MAX_STALE_RETRIES => {
                    stale_retries += 1;
                    tracing::debug!(owner_id, lock_id, "Lock changed during decay, re-reading");
                }
                Err(err @ StoreError::Stale(_)) => {
                    tracing::warn!(owner_id, lock_id = stored.id, error = %err, "Lock decay abandoned");
                    return Ok(outcome(&stored, budget, plan.next, false, Some(err.to_string())));
                }
                Err(err) => {
                    tracing::warn!(owner_id, lock_id = stored.id, error = %err, "Lock decay write failed");
                    slot.pending = Some(PendingDecay {
                        lock_id: stored.id,
                        base_modified: stored.last_modified,
                        remaining: plan.next,
                    });
                    return Ok(outcome(&stored, budget, plan.next, false, Some(err.to_string())));
                }
            }
        }
    }

    /// Drop any per-owner state, e.g. after the owner's lock is deleted.
    pub async fn forget(&self, owner_id: DbId) {
        self.slots.lock().await.remove(&owner_id);
    }

    async fn slot(&self, owner_id: DbId) -> Arc<Mutex<OwnerSlot>> {
        self.slots
            .lock()
            .await
            .entry(owner_id)
            .or_default()
            .clone()
    }

    /// Remove the owner's slot once no report is queued on it and it holds no
    /// unpersisted value.
    async fn release(&self, owner_id: DbId, slot: Arc<Mutex<OwnerSlot>>) {
        let mut slots = self.slots.lock().await;
        let current = slots
            .get(&owner_id)
            .is_some_and(|held| Arc::ptr_eq(held, &slot));

        // Clones are only handed out under the map lock, so two references
        // means the map's and ours.
        if current && Arc::strong_count(&slot) == 2 {
            let idle = slot.try_lock().is_ok_and(|s| s.pending.is_none());
            if idle {
                slots.remove(&owner_id);
            }
        }
    }

    #[cfg(test)]
    async fn tracked_owners(&self) -> usize {
        self.slots.lock().await.len()
    }

    /// Execute a persist effect as a conditional write against the row
    /// version it was planned from.
    async fn dispatch(
        &self,
        effect: LockEffect,
        expected_modified: Timestamp,
    ) -> Result<LockState, StoreError> {
        let LockEffect::Persist {
            lock_id,
            browse,
            activity,
        } = effect;

        tokio::time::timeout(
            self.persist_timeout,
            self.store
                .update_remaining(lock_id, expected_modified, browse, activity),
        )
        .await
        .unwrap_or_else(|_| {
            Err(StoreError::Backend(format!(
                "Lock update timed out after {} ms",
                self.persist_timeout.as_millis()
            )))
        })
    }
}

fn outcome(
    lock: &LockState,
    budget: Budget,
    remaining: Remaining,
    persisted: bool,
    alert: Option<String>,
) -> DecayOutcome {
    DecayOutcome {
        lock_id: lock.id,
        owner_id: lock.owner_id,
        budget,
        browse_time_remaining: remaining.browse,
        activity_time_remaining: remaining.activity,
        locked: is_locked(remaining),
        persisted,
        alert,
    }
}
