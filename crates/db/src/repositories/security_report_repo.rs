//! Repository for the `security_reports` table.

use hearth_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::security_report::{CreateSecurityReport, SecurityReport};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, community_id, reporter_id, subject, body, created_at";

/// Provides security-report operations.
pub struct SecurityReportRepo;

impl SecurityReportRepo {
    /// File a new report, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSecurityReport,
    ) -> Result<SecurityReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO security_reports (community_id, reporter_id, subject, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SecurityReport>(&query)
            .bind(input.community_id)
            .bind(input.reporter_id)
            .bind(&input.subject)
            .bind(&input.body)
            .fetch_one(pool)
            .await
    }

    /// Whether the user has ever filed a report in this community. Feeds
    /// the role-restore fallback heuristic.
    pub async fn has_reported(
        conn: &mut PgConnection,
        community_id: DbId,
        reporter_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM security_reports
                WHERE community_id = $1 AND reporter_id = $2
             )",
        )
        .bind(community_id)
        .bind(reporter_id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// List a community's reports, newest first.
    pub async fn list_by_community(
        pool: &PgPool,
        community_id: DbId,
    ) -> Result<Vec<SecurityReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM security_reports
             WHERE community_id = $1
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, SecurityReport>(&query)
            .bind(community_id)
            .fetch_all(pool)
            .await
    }
}
