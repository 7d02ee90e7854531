//! Subscription ledger transitions.
//!
//! [`reconcile`] is the single point where expiry becomes real: nothing
//! else in the system may infer expiry on its own. Every function here
//! opens a transaction, row-locks the subscription, applies the
//! transition plus its role cascade, and commits -- so concurrent callers
//! for the same owner serialize instead of interleaving.

use chrono::{Duration, Utc};
use hearth_core::error::CoreError;
use hearth_core::roles::Role;
use hearth_core::subscription::{
    deletion_date_after, is_active_at, should_expire, SubscriptionStatus,
};
use hearth_core::types::{DbId, Timestamp};
use hearth_db::models::subscription::Subscription;
use hearth_db::repositories::{SubscriptionRepo, UserRepo};
use sqlx::PgPool;

use crate::config::LifecycleConfig;
use crate::engine::{roles, with_tx_retry};
use crate::error::{AppError, AppResult};

/// Lazily reconcile the owner's subscription with the clock.
///
/// Returns the fresh row, or `None` when the owner has no ledger. When an
/// elapsed `expiry_date` is detected on an `active` (or `cancelled`)
/// subscription, flips it to `expired`, stamps the trial grace window, and
/// demotes the owner and members inside the same transaction.
pub async fn reconcile(pool: &PgPool, owner_id: DbId) -> AppResult<Option<Subscription>> {
    with_tx_retry("subscription reconcile", || async move {
        let mut tx = pool.begin().await?;

        let Some(sub) = SubscriptionRepo::lock_by_owner(&mut tx, owner_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !should_expire(sub.status, sub.expiry_date, now) {
            tx.commit().await?;
            return Ok(Some(sub));
        }

        let (trial_expired_at, data_deletion_date) = if sub.is_trial {
            (Some(now), Some(deletion_date_after(now)))
        } else {
            (None, None)
        };

        let updated =
            SubscriptionRepo::mark_expired(&mut tx, sub.id, trial_expired_at, data_deletion_date)
                .await?;
        roles::demote(&mut tx, &updated).await?;
        tx.commit().await?;

        tracing::info!(
            owner_id,
            is_trial = updated.is_trial,
            "Subscription expired; owner and members demoted"
        );
        Ok(Some(updated))
    })
    .await
}

/// Reconcile-then-read activity check. Never reads a possibly-stale
/// status directly.
pub async fn is_active(pool: &PgPool, owner_id: DbId) -> AppResult<bool> {
    match reconcile(pool, owner_id).await? {
        Some(sub) => Ok(is_active_at(sub.status, sub.expiry_date, Utc::now())),
        None => Ok(false),
    }
}

/// Cancel the owner's subscription.
///
/// By default roles are left alone; the demotion happens at the next
/// reconciliation that finds an elapsed expiry date. With
/// `demote_on_cancel` set, the cascade runs in the cancel transaction.
pub async fn cancel(
    pool: &PgPool,
    lifecycle: &LifecycleConfig,
    owner_id: DbId,
) -> AppResult<Subscription> {
    with_tx_retry("subscription cancel", || async move {
        let mut tx = pool.begin().await?;

        let Some(sub) = SubscriptionRepo::lock_by_owner(&mut tx, owner_id).await? else {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "subscription",
                id: owner_id,
            }));
        };

        let updated = SubscriptionRepo::mark_cancelled(&mut tx, sub.id).await?;
        if lifecycle.demote_on_cancel {
            roles::demote(&mut tx, &updated).await?;
        }
        tx.commit().await?;

        tracing::info!(
            owner_id,
            demote_on_cancel = lifecycle.demote_on_cancel,
            "Subscription cancelled"
        );
        Ok(updated)
    })
    .await
}

/// Re-activate a cancelled or expired subscription.
///
/// The role restore runs *before* the status flip, in the same
/// transaction, so callers observe role state and subscription status
/// change together. `new_expiry` replaces the previous expiry date;
/// `None` leaves the subscription open-ended.
pub async fn activate(
    pool: &PgPool,
    lifecycle: &LifecycleConfig,
    owner_id: DbId,
    new_expiry: Option<Timestamp>,
) -> AppResult<Subscription> {
    with_tx_retry("subscription activate", || async move {
        let mut tx = pool.begin().await?;

        let Some(sub) = SubscriptionRepo::lock_by_owner(&mut tx, owner_id).await? else {
            return Err(AppError::Core(CoreError::NotFound {
                entity: "subscription",
                id: owner_id,
            }));
        };

        if sub.status != SubscriptionStatus::Active {
            roles::restore(&mut tx, lifecycle, &sub).await?;
        }
        let updated = SubscriptionRepo::mark_active(&mut tx, sub.id, new_expiry).await?;
        tx.commit().await?;

        tracing::info!(owner_id, "Subscription activated; roles restored");
        Ok(updated)
    })
    .await
}

/// Start (or re-arm) a trial for the user.
///
/// Only guests and community owners may start one; a guest is promoted to
/// `communityowner` as part of the contract. Re-arming a lapsed ledger
/// first restores roles, then clears every stamp from the previous trial.
pub async fn start_trial(
    pool: &PgPool,
    lifecycle: &LifecycleConfig,
    user_id: DbId,
    days: i64,
) -> AppResult<Subscription> {
    with_tx_retry("trial start", || async move {
        let mut tx = pool.begin().await?;

        let user = UserRepo::lock_by_id(&mut tx, user_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "user",
                id: user_id,
            }))?;

        if !matches!(user.role, Role::Guest | Role::CommunityOwner) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only guests and community owners may start a trial".into(),
            )));
        }

        let now = Utc::now();
        if let Some(existing) = SubscriptionRepo::lock_by_owner(&mut tx, user_id).await? {
            if is_active_at(existing.status, existing.expiry_date, now) {
                return Err(AppError::Core(CoreError::Conflict(
                    "Subscription is already active".into(),
                )));
            }
            // Re-arming a lapsed ledger is a reactivation: bring demoted
            // roles back before the old snapshot is wiped.
            roles::restore(&mut tx, lifecycle, &existing).await?;
        }

        if user.role == Role::Guest {
            UserRepo::set_role(&mut tx, user_id, Role::CommunityOwner).await?;
        }

        let sub = SubscriptionRepo::upsert_trial(&mut tx, user_id, now + Duration::days(days))
            .await?;
        tx.commit().await?;

        tracing::info!(user_id, days, "Trial started");
        Ok(sub)
    })
    .await
}
