//! Shared query parameter types for API handlers.

use fritter_core::types::DbId;
use serde::Deserialize;

/// Optional owner filter (`?owner_id=`) for list endpoints.
#[derive(Debug, Deserialize)]
pub struct OwnerFilter {
    pub owner_id: Option<DbId>,
}
