//! Repository for the `communities` table.

use hearth_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::community::{Community, CreateCommunity};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, name, address, join_code, created_at";

/// Provides CRUD operations for communities.
pub struct CommunityRepo;

impl CommunityRepo {
    /// Insert a new community, returning the created row.
    ///
    /// Fails with a unique violation (`uq_communities_owner`) if the owner
    /// already has one.
    pub async fn create(pool: &PgPool, input: &CreateCommunity) -> Result<Community, sqlx::Error> {
        let query = format!(
            "INSERT INTO communities (owner_id, name, address, join_code)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Community>(&query)
            .bind(input.owner_id)
            .bind(&input.name)
            .bind(&input.address)
            .bind(&input.join_code)
            .fetch_one(pool)
            .await
    }

    /// Find a community by its internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Community>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM communities WHERE id = $1");
        sqlx::query_as::<_, Community>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the community owned by the given user.
    pub async fn find_by_owner(
        conn: &mut PgConnection,
        owner_id: DbId,
    ) -> Result<Option<Community>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM communities WHERE owner_id = $1");
        sqlx::query_as::<_, Community>(&query)
            .bind(owner_id)
            .fetch_optional(conn)
            .await
    }

    /// Find a community by join code.
    pub async fn find_by_join_code(
        pool: &PgPool,
        join_code: &str,
    ) -> Result<Option<Community>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM communities WHERE join_code = $1");
        sqlx::query_as::<_, Community>(&query)
            .bind(join_code)
            .fetch_optional(pool)
            .await
    }

    /// Delete all communities owned by a user. Memberships and reports go
    /// with them via `ON DELETE CASCADE`. Returns the number of rows
    /// removed (0 or 1 given the owner uniqueness constraint).
    pub async fn delete_by_owner(
        conn: &mut PgConnection,
        owner_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM communities WHERE owner_id = $1")
            .bind(owner_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
