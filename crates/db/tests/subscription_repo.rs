//! Integration tests for subscription persistence: trial upsert,
//! transitions, snapshot storage, and the sweep candidate query.

use chrono::{Duration, Utc};
use hearth_core::roles::Role;
use hearth_core::snapshot::RoleSnapshot;
use hearth_core::subscription::SubscriptionStatus;
use hearth_db::models::user::CreateUser;
use hearth_db::repositories::{SubscriptionRepo, UserRepo};
use sqlx::PgPool;

async fn owner(pool: &PgPool, name: &str) -> i64 {
    UserRepo::create(
        pool,
        &CreateUser {
            username: name.to_string(),
            email: format!("{name}@test.com"),
            password_hash: "$argon2id$fake".to_string(),
            role: Role::CommunityOwner,
        },
    )
    .await
    .expect("owner creation should succeed")
    .id
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_trial_creates_active_ledger(pool: PgPool) {
    let owner_id = owner(&pool, "trial_owner").await;
    let expiry = Utc::now() + Duration::days(30);

    let mut conn = pool.acquire().await.expect("acquire");
    let sub = SubscriptionRepo::upsert_trial(&mut conn, owner_id, expiry)
        .await
        .expect("upsert should succeed");

    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert!(sub.is_trial);
    assert_eq!(sub.expiry_date, Some(expiry));
    assert!(sub.cancelled_at.is_none());
    assert!(sub.data_deletion_date.is_none());
    assert!(sub.snapshot().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_trial_clears_previous_stamps(pool: PgPool) {
    let owner_id = owner(&pool, "returning_owner").await;
    let mut conn = pool.acquire().await.expect("acquire");

    let first = SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now())
        .await
        .expect("first upsert should succeed");
    SubscriptionRepo::mark_expired(
        &mut conn,
        first.id,
        Some(Utc::now()),
        Some(Utc::now() + Duration::days(30)),
    )
    .await
    .expect("mark_expired should succeed");

    let mut snapshot = RoleSnapshot::default();
    snapshot.record_owner(Role::CommunityOwner);
    SubscriptionRepo::save_snapshot(&mut conn, first.id, &snapshot)
        .await
        .expect("save_snapshot should succeed");

    // Re-arm. Everything from the previous trial must be wiped.
    let second =
        SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now() + Duration::days(14))
            .await
            .expect("second upsert should succeed");
    assert_eq!(second.id, first.id, "same ledger row, re-armed");
    assert_eq!(second.status, SubscriptionStatus::Active);
    assert!(second.trial_expired_at.is_none());
    assert!(second.data_deletion_date.is_none());
    assert!(second.data_deleted_at.is_none());
    assert!(second.snapshot().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_transitions_stamp_timestamps(pool: PgPool) {
    let owner_id = owner(&pool, "transitions").await;
    let mut conn = pool.acquire().await.expect("acquire");

    let sub = SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now() + Duration::days(7))
        .await
        .expect("upsert should succeed");

    let cancelled = SubscriptionRepo::mark_cancelled(&mut conn, sub.id)
        .await
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let active = SubscriptionRepo::mark_active(&mut conn, sub.id, None)
        .await
        .expect("activate should succeed");
    assert_eq!(active.status, SubscriptionStatus::Active);
    assert!(active.cancelled_at.is_none());
    assert!(active.expiry_date.is_none(), "open-ended after activate");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_snapshot_round_trips_through_jsonb(pool: PgPool) {
    let owner_id = owner(&pool, "snapshot_owner").await;
    let mut conn = pool.acquire().await.expect("acquire");
    let sub = SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now() + Duration::days(7))
        .await
        .expect("upsert should succeed");

    let mut snapshot = RoleSnapshot::default();
    snapshot.record_owner(Role::CommunityOwner);
    snapshot.record_member(41, Role::Resident);
    snapshot.record_member(42, Role::Security);
    SubscriptionRepo::save_snapshot(&mut conn, sub.id, &snapshot)
        .await
        .expect("save should succeed");

    let loaded = SubscriptionRepo::find_by_owner(&pool, owner_id)
        .await
        .expect("find should succeed")
        .expect("subscription should exist");
    assert_eq!(loaded.snapshot(), &snapshot);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deletion_candidates_filtering(pool: PgPool) {
    let due = owner(&pool, "due_owner").await;
    let not_due = owner(&pool, "not_due_owner").await;
    let already_deleted = owner(&pool, "deleted_owner").await;

    let mut conn = pool.acquire().await.expect("acquire");
    for (owner_id, deletion_offset_days) in [(due, -1), (not_due, 1), (already_deleted, -2)] {
        let sub = SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now())
            .await
            .expect("upsert should succeed");
        SubscriptionRepo::mark_expired(
            &mut conn,
            sub.id,
            Some(Utc::now()),
            Some(Utc::now() + Duration::days(deletion_offset_days)),
        )
        .await
        .expect("mark_expired should succeed");
        if owner_id == already_deleted {
            assert!(SubscriptionRepo::mark_data_deleted(&mut conn, sub.id, Utc::now())
                .await
                .expect("mark_data_deleted should succeed"));
        }
    }

    let candidates = SubscriptionRepo::deletion_candidates(&pool, Utc::now())
        .await
        .expect("candidate query should succeed");
    assert_eq!(candidates.len(), 1, "only the due, unclaimed trial");
    assert_eq!(candidates[0].owner_id, due);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_data_deleted_claims_once(pool: PgPool) {
    let owner_id = owner(&pool, "claim_owner").await;
    let mut conn = pool.acquire().await.expect("acquire");
    let sub = SubscriptionRepo::upsert_trial(&mut conn, owner_id, Utc::now())
        .await
        .expect("upsert should succeed");

    assert!(SubscriptionRepo::mark_data_deleted(&mut conn, sub.id, Utc::now())
        .await
        .expect("first claim should succeed"));
    assert!(
        !SubscriptionRepo::mark_data_deleted(&mut conn, sub.id, Utc::now())
            .await
            .expect("second claim should succeed"),
        "second claim must lose"
    );
}
