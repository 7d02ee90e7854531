//! Membership entity model.

use hearth_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A membership row from the `memberships` table.
///
/// `user_id` is unique table-wide: a user holds at most one membership,
/// whatever the community.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Membership {
    pub id: DbId,
    pub user_id: DbId,
    pub community_id: DbId,
    pub joined_at: Timestamp,
}
