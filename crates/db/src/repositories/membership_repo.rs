//! Repository for the `memberships` table.

use hearth_core::roles::Role;
use hearth_core::types::DbId;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::models::membership::Membership;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, community_id, joined_at";

/// A member of a community together with their current role, as loaded by
/// the demotion/restore cascades and the member-list endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommunityMember {
    pub user_id: DbId,
    pub role: Role,
}

/// Provides membership operations.
pub struct MembershipRepo;

impl MembershipRepo {
    /// Create a membership, atomically replacing any existing one for the
    /// same user (explicit last-writer-wins on the `user_id` uniqueness
    /// constraint). Exactly one row per user exists afterwards.
    pub async fn upsert(
        conn: &mut PgConnection,
        user_id: DbId,
        community_id: DbId,
    ) -> Result<Membership, sqlx::Error> {
        let query = format!(
            "INSERT INTO memberships (user_id, community_id)
             VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_memberships_user
             DO UPDATE SET community_id = EXCLUDED.community_id, joined_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Membership>(&query)
            .bind(user_id)
            .bind(community_id)
            .fetch_one(conn)
            .await
    }

    /// The user's current membership, if any.
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Membership>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM memberships WHERE user_id = $1");
        sqlx::query_as::<_, Membership>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a user's membership. Returns `true` if a row was removed.
    pub async fn delete_by_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memberships WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All current members of a community with their roles, ordered by
    /// user id for deterministic cascade order.
    pub async fn list_members(
        conn: &mut PgConnection,
        community_id: DbId,
    ) -> Result<Vec<CommunityMember>, sqlx::Error> {
        sqlx::query_as::<_, CommunityMember>(
            "SELECT m.user_id, u.role
             FROM memberships m
             JOIN users u ON u.id = m.user_id
             WHERE m.community_id = $1
             ORDER BY m.user_id",
        )
        .bind(community_id)
        .fetch_all(conn)
        .await
    }

}
