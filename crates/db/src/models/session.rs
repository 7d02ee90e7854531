//! Session entity model and DTOs.

use hearth_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::FromRow;

/// A session row from the `sessions` table.
///
/// Stores only the SHA-256 of the refresh token so a database leak does
/// not compromise active sessions.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for creating a session.
#[derive(Debug, Deserialize)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
