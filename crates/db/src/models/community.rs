//! Community entity model and DTOs.

use hearth_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A community row from the `communities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Community {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub address: Option<String>,
    /// Redeemable code members use to join. Unique per community.
    pub join_code: String,
    pub created_at: Timestamp,
}

/// DTO for creating a community.
#[derive(Debug, Deserialize)]
pub struct CreateCommunity {
    pub owner_id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub join_code: String,
}
