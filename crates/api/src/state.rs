use std::sync::Arc;
use std::time::Duration;

use fritter_core::engine::DecayEngine;
use fritter_db::lock_store::PgLockStore;

use crate::config::ServerConfig;

/// Decay engine wired to the PostgreSQL lock store.
pub type LockDecayEngine = DecayEngine<PgLockStore>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: fritter_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Serializes decay reports per owner; must be shared by every handler.
    pub decay_engine: Arc<LockDecayEngine>,
}

impl AppState {
    pub fn new(pool: fritter_db::DbPool, config: ServerConfig) -> Self {
        let decay_engine = DecayEngine::with_persist_timeout(
            PgLockStore::new(pool.clone()),
            Duration::from_millis(config.lock_persist_timeout_ms),
        );
        Self {
            pool,
            config: Arc::new(config),
            decay_engine: Arc::new(decay_engine),
        }
    }
}
