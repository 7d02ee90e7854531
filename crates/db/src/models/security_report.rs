//! Security-report entity model and DTOs.

use hearth_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A report row from the `security_reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SecurityReport {
    pub id: DbId,
    pub community_id: DbId,
    pub reporter_id: DbId,
    pub subject: String,
    pub body: String,
    pub created_at: Timestamp,
}

/// DTO for filing a report.
#[derive(Debug, Deserialize)]
pub struct CreateSecurityReport {
    pub community_id: DbId,
    pub reporter_id: DbId,
    pub subject: String,
    pub body: String,
}
