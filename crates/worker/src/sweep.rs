//! Trial data-deletion sweep.
//!
//! Finds expired trials whose grace window has elapsed and irreversibly
//! deletes the owner's community data. This is the only irreversible
//! transition in the lifecycle, so it runs as an explicit scheduled job
//! with full logging -- never as a side effect of a request path.
//!
//! The sweep is idempotent and independent of role state: each candidate
//! is claimed by stamping `data_deleted_at` inside the same transaction
//! as the deletion, and the candidate query skips stamped rows. Roles may
//! have been restored and re-demoted any number of times in between; the
//! sweep never looks at them.

use chrono::Utc;
use hearth_core::types::DbId;
use hearth_db::repositories::{CommunityRepo, SubscriptionRepo};
use hearth_db::DbPool;

/// Outcome of one sweep run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates found due for deletion.
    pub candidates: usize,
    /// Candidates whose data was deleted this run.
    pub deleted: usize,
    /// Candidates that failed; the run continued past them.
    pub failed: usize,
    /// True when the run only reported and touched nothing.
    pub dry_run: bool,
}

/// Run one sweep over all due candidates.
///
/// With `dry_run` set, candidates are logged and counted but nothing is
/// deleted or stamped. A failure on one candidate is logged with its
/// owner and subscription id and the batch continues.
pub async fn run_sweep(pool: &DbPool, dry_run: bool) -> Result<SweepReport, sqlx::Error> {
    let now = Utc::now();
    let candidates = SubscriptionRepo::deletion_candidates(pool, now).await?;

    let mut report = SweepReport {
        candidates: candidates.len(),
        dry_run,
        ..SweepReport::default()
    };

    for sub in candidates {
        if dry_run {
            tracing::info!(
                subscription_id = sub.id,
                owner_id = sub.owner_id,
                deletion_due = ?sub.data_deletion_date,
                "Dry run: trial data due for deletion"
            );
            continue;
        }

        match delete_candidate(pool, sub.id, sub.owner_id).await {
            Ok(true) => {
                report.deleted += 1;
                tracing::info!(
                    subscription_id = sub.id,
                    owner_id = sub.owner_id,
                    "Trial data deleted"
                );
            }
            Ok(false) => {
                // A concurrent sweep claimed it between the candidate
                // query and our transaction.
                tracing::debug!(
                    subscription_id = sub.id,
                    owner_id = sub.owner_id,
                    "Candidate already claimed; skipping"
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::error!(
                    subscription_id = sub.id,
                    owner_id = sub.owner_id,
                    error = %e,
                    "Trial data deletion failed; continuing with next candidate"
                );
            }
        }
    }

    tracing::info!(
        candidates = report.candidates,
        deleted = report.deleted,
        failed = report.failed,
        dry_run,
        "Sweep run complete"
    );
    Ok(report)
}

/// Delete one candidate's community data and stamp the subscription.
///
/// Returns `Ok(false)` when another run already claimed the candidate.
async fn delete_candidate(
    pool: &DbPool,
    subscription_id: DbId,
    owner_id: DbId,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    // Claim first: the guarded stamp is the idempotence point.
    let claimed = SubscriptionRepo::mark_data_deleted(&mut tx, subscription_id, Utc::now()).await?;
    if !claimed {
        return Ok(false);
    }

    // Memberships and reports cascade with the community rows.
    CommunityRepo::delete_by_owner(&mut tx, owner_id).await?;

    tx.commit().await?;
    Ok(true)
}
