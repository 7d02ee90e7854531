//! Integration tests for membership uniqueness and replacement.
//!
//! Exercises the repository layer against a real database: the one-
//! membership-per-user invariant, atomic replacement, and the member
//! listing used by the role cascades.

use hearth_core::roles::Role;
use hearth_db::models::community::CreateCommunity;
use hearth_db::models::user::CreateUser;
use hearth_db::repositories::{CommunityRepo, MembershipRepo, UserRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_user(username: &str, role: Role) -> CreateUser {
    CreateUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password_hash: "$argon2id$fake".to_string(),
        role,
    }
}

async fn community_for(pool: &PgPool, owner_name: &str, code: &str) -> (i64, i64) {
    let owner = UserRepo::create(pool, &new_user(owner_name, Role::CommunityOwner))
        .await
        .expect("owner creation should succeed");
    let community = CommunityRepo::create(
        pool,
        &CreateCommunity {
            owner_id: owner.id,
            name: format!("{owner_name}'s community"),
            address: None,
            join_code: code.to_string(),
        },
    )
    .await
    .expect("community creation should succeed");
    (owner.id, community.id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_creates_single_row(pool: PgPool) {
    let (_, community_id) = community_for(&pool, "owner_a", "CODEA001").await;
    let member = UserRepo::create(&pool, &new_user("resident_a", Role::Guest))
        .await
        .expect("member creation should succeed");

    let mut conn = pool.acquire().await.expect("acquire");
    let membership = MembershipRepo::upsert(&mut conn, member.id, community_id)
        .await
        .expect("upsert should succeed");
    assert_eq!(membership.user_id, member.id);
    assert_eq!(membership.community_id, community_id);

    let found = MembershipRepo::find_by_user(&pool, member.id)
        .await
        .expect("find should succeed")
        .expect("membership should exist");
    assert_eq!(found.id, membership.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_membership_replaces_first(pool: PgPool) {
    let (_, first_community) = community_for(&pool, "owner_b", "CODEB001").await;
    let (_, second_community) = community_for(&pool, "owner_c", "CODEC001").await;
    let member = UserRepo::create(&pool, &new_user("mover", Role::Guest))
        .await
        .expect("member creation should succeed");

    let mut conn = pool.acquire().await.expect("acquire");
    MembershipRepo::upsert(&mut conn, member.id, first_community)
        .await
        .expect("first upsert should succeed");
    MembershipRepo::upsert(&mut conn, member.id, second_community)
        .await
        .expect("second upsert should succeed");

    // Exactly one row afterwards, pointing at the new community.
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memberships WHERE user_id = $1")
        .bind(member.id)
        .fetch_one(&pool)
        .await
        .expect("count should succeed");
    assert_eq!(count, 1, "replacement must not create a second row");

    let found = MembershipRepo::find_by_user(&pool, member.id)
        .await
        .expect("find should succeed")
        .expect("membership should exist");
    assert_eq!(found.community_id, second_community);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_members_carries_roles(pool: PgPool) {
    let (_, community_id) = community_for(&pool, "owner_d", "CODED001").await;

    let resident = UserRepo::create(&pool, &new_user("res_d", Role::Resident))
        .await
        .expect("resident creation should succeed");
    let security = UserRepo::create(&pool, &new_user("sec_d", Role::Security))
        .await
        .expect("security creation should succeed");

    let mut conn = pool.acquire().await.expect("acquire");
    MembershipRepo::upsert(&mut conn, resident.id, community_id)
        .await
        .expect("upsert should succeed");
    MembershipRepo::upsert(&mut conn, security.id, community_id)
        .await
        .expect("upsert should succeed");

    let members = MembershipRepo::list_members(&mut conn, community_id)
        .await
        .expect("list should succeed");
    assert_eq!(members.len(), 2);

    let roles: Vec<Role> = members.iter().map(|m| m.role).collect();
    assert!(roles.contains(&Role::Resident));
    assert!(roles.contains(&Role::Security));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_by_user(pool: PgPool) {
    let (_, community_id) = community_for(&pool, "owner_e", "CODEE001").await;
    let member = UserRepo::create(&pool, &new_user("leaver", Role::Resident))
        .await
        .expect("member creation should succeed");

    let mut conn = pool.acquire().await.expect("acquire");
    MembershipRepo::upsert(&mut conn, member.id, community_id)
        .await
        .expect("upsert should succeed");

    assert!(MembershipRepo::delete_by_user(&mut conn, member.id)
        .await
        .expect("delete should succeed"));
    // Second delete finds nothing.
    assert!(!MembershipRepo::delete_by_user(&mut conn, member.id)
        .await
        .expect("delete should succeed"));
}
