//! Repository for the `locks` table.
//!
//! Every read joins `users` to expose the owner's username. Writes go through
//! a CTE so the same joined column list can be returned.

use fritter_core::lock::Remaining;
use fritter_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::lock::{CreateLock, ImportLock, Lock, UpdateLock};

/// Column list for joined `locks` queries (`l` = locks, `u` = users).
const COLUMNS: &str = "\
    l.id, l.owner_id, u.username AS owner, l.lock_type, \
    l.browse_time_remaining, l.activity_time_remaining, l.last_modified";

/// Provides data access for locks.
pub struct LockRepo;

impl LockRepo {
    /// Create a lock with the default budgets.
    ///
    /// A second lock for the same owner violates `uq_locks_owner_id`.
    pub async fn create(pool: &PgPool, dto: &CreateLock) -> Result<Lock, sqlx::Error> {
        Self::insert(pool, dto.owner_id, &dto.lock_type, Remaining::defaults()).await
    }

    /// Create a lock from legacy data with already-normalized budgets.
    pub async fn import(pool: &PgPool, dto: &ImportLock) -> Result<Lock, sqlx::Error> {
        Self::insert(pool, dto.owner_id, &dto.lock_type, dto.remaining).await
    }

    async fn insert(
        pool: &PgPool,
        owner_id: DbId,
        lock_type: &str,
        remaining: Remaining,
    ) -> Result<Lock, sqlx::Error> {
        let query = format!(
            "WITH l AS ( \
                 INSERT INTO locks (owner_id, lock_type, browse_time_remaining, activity_time_remaining) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM l JOIN users u ON u.id = l.owner_id"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(owner_id)
            .bind(lock_type)
            .bind(remaining.browse)
            .bind(remaining.activity)
            .fetch_one(pool)
            .await
    }

    /// Find a lock by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locks l JOIN users u ON u.id = l.owner_id WHERE l.id = $1"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the single lock belonging to an owner.
    pub async fn find_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locks l JOIN users u ON u.id = l.owner_id \
             WHERE l.owner_id = $1"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's locks. Holds at most one row.
    pub async fn list_by_owner(pool: &PgPool, owner_id: DbId) -> Result<Vec<Lock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locks l JOIN users u ON u.id = l.owner_id \
             WHERE l.owner_id = $1 \
             ORDER BY l.last_modified DESC"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    /// List all locks, most recently modified first.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Lock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM locks l JOIN users u ON u.id = l.owner_id \
             ORDER BY l.last_modified DESC, l.id DESC"
        );
        sqlx::query_as::<_, Lock>(&query).fetch_all(pool).await
    }

    /// Apply an owner edit.
    ///
    /// `last_modified` strictly advances on every write, so it doubles as the
    /// row version checked by [`LockRepo::update_remaining`]. Returns `None`
    /// if the lock does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        dto: &UpdateLock,
    ) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!(
            "WITH l AS ( \
                 UPDATE locks SET \
                     browse_time_remaining = $2, \
                     activity_time_remaining = $3, \
                     lock_type = COALESCE($4, lock_type), \
                     last_modified = GREATEST(last_modified + INTERVAL '1 microsecond', NOW()) \
                 WHERE id = $1 \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM l JOIN users u ON u.id = l.owner_id"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(id)
            .bind(dto.browse_time_remaining)
            .bind(dto.activity_time_remaining)
            .bind(dto.lock_type.as_deref())
            .fetch_optional(pool)
            .await
    }

    /// Overwrite only the two budgets, provided the row is still at
    /// `expected_modified`. Used by the decay engine.
    ///
    /// Returns `None` when the lock is gone or was written in the meantime.
    pub async fn update_remaining(
        pool: &PgPool,
        id: DbId,
        expected_modified: Timestamp,
        browse: f64,
        activity: f64,
    ) -> Result<Option<Lock>, sqlx::Error> {
        let query = format!(
            "WITH l AS ( \
                 UPDATE locks SET \
                     browse_time_remaining = $3, \
                     activity_time_remaining = $4, \
                     last_modified = GREATEST(last_modified + INTERVAL '1 microsecond', NOW()) \
                 WHERE id = $1 AND last_modified = $2 \
                 RETURNING * \
             ) \
             SELECT {COLUMNS} FROM l JOIN users u ON u.id = l.owner_id"
        );
        sqlx::query_as::<_, Lock>(&query)
            .bind(id)
            .bind(expected_modified)
            .bind(browse)
            .bind(activity)
            .fetch_optional(pool)
            .await
    }

    /// Delete a lock by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every lock owned by `owner_id`. Returns the number removed.
    pub async fn delete_by_owner(pool: &PgPool, owner_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM locks WHERE owner_id = $1")
            .bind(owner_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
