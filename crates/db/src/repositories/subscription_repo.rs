//! Repository for the `subscriptions` table.
//!
//! Every state transition goes through a caller-owned transaction that
//! first takes the row lock via [`SubscriptionRepo::lock_by_owner`]; that
//! lock is what serializes reconciliation per subscription identity.

use hearth_core::snapshot::RoleSnapshot;
use hearth_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::subscription::Subscription;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, status, is_trial, start_date, expiry_date, \
    cancelled_at, trial_expired_at, data_deletion_date, data_deleted_at, \
    original_roles, created_at, updated_at";

/// Provides subscription persistence operations.
pub struct SubscriptionRepo;

impl SubscriptionRepo {
    /// Find a subscription by owner without locking. Read-only callers
    /// must still reconcile before trusting `status`.
    pub async fn find_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE owner_id = $1");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Lock and load a subscription by owner inside a caller-owned
    /// transaction. Concurrent reconcilers queue here.
    pub async fn lock_by_owner(
        conn: &mut PgConnection,
        owner_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE owner_id = $1 FOR UPDATE");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(owner_id)
            .fetch_optional(conn)
            .await
    }

    /// Create or re-arm a trial subscription for the owner.
    ///
    /// Clears every stamp from a previous trial (expiry bookkeeping,
    /// deletion dates, snapshot) so a returning owner starts clean.
    pub async fn upsert_trial(
        conn: &mut PgConnection,
        owner_id: DbId,
        expiry_date: Timestamp,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions (owner_id, status, is_trial, expiry_date)
             VALUES ($1, 'active', TRUE, $2)
             ON CONFLICT ON CONSTRAINT uq_subscriptions_owner
             DO UPDATE SET
                status = 'active',
                is_trial = TRUE,
                start_date = NOW(),
                expiry_date = EXCLUDED.expiry_date,
                cancelled_at = NULL,
                trial_expired_at = NULL,
                data_deletion_date = NULL,
                data_deleted_at = NULL,
                original_roles = '{{}}'::jsonb,
                updated_at = NOW()
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(owner_id)
            .bind(expiry_date)
            .fetch_one(conn)
            .await
    }

    /// Apply the expiry transition detected by reconciliation, returning
    /// the updated row.
    ///
    /// For trials, stamps `trial_expired_at` and `data_deletion_date`;
    /// both stay NULL for paid subscriptions.
    pub async fn mark_expired(
        conn: &mut PgConnection,
        id: DbId,
        trial_expired_at: Option<Timestamp>,
        data_deletion_date: Option<Timestamp>,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                status = 'expired',
                trial_expired_at = COALESCE($2, trial_expired_at),
                data_deletion_date = COALESCE($3, data_deletion_date),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(id)
            .bind(trial_expired_at)
            .bind(data_deletion_date)
            .fetch_one(conn)
            .await
    }

    /// Apply the cancel transition, returning the updated row.
    pub async fn mark_cancelled(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = NOW(),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(id)
            .fetch_one(conn)
            .await
    }

    /// Apply the activate transition, returning the updated row.
    /// `expiry_date` replaces the old value; `None` leaves the
    /// subscription open-ended.
    pub async fn mark_active(
        conn: &mut PgConnection,
        id: DbId,
        expiry_date: Option<Timestamp>,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                status = 'active',
                expiry_date = $2,
                cancelled_at = NULL,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(id)
            .bind(expiry_date)
            .fetch_one(conn)
            .await
    }

    /// Persist the role snapshot for the current lapse episode.
    pub async fn save_snapshot(
        conn: &mut PgConnection,
        id: DbId,
        snapshot: &RoleSnapshot,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE subscriptions SET original_roles = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(Json(snapshot))
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Expired trials whose grace window has elapsed and whose data has
    /// not been deleted yet. The sweep's candidate query.
    pub async fn deletion_candidates(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<Subscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscriptions
             WHERE is_trial
               AND status = 'expired'
               AND data_deletion_date IS NOT NULL
               AND data_deletion_date <= $1
               AND data_deleted_at IS NULL
             ORDER BY data_deletion_date"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }

    /// Stamp a candidate as deleted. Guarded on `data_deleted_at IS NULL`
    /// so a racing sweep cannot claim the same candidate twice; returns
    /// `true` only for the run that won.
    pub async fn mark_data_deleted(
        conn: &mut PgConnection,
        id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET data_deleted_at = $2, updated_at = NOW()
             WHERE id = $1 AND data_deleted_at IS NULL",
        )
        .bind(id)
        .bind(now)
        .execute(conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
