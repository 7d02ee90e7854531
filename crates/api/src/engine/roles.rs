//! Role coordination: demotion/restore cascades and membership hooks.
//!
//! All functions here take `&mut PgConnection` and run inside the caller's
//! transaction -- the one that already holds the subscription row lock for
//! demote/restore, or the membership write for the hooks. Role state is
//! mutated nowhere else.

use hearth_core::roles::Role;
use hearth_core::snapshot::RoleSnapshot;
use hearth_core::types::DbId;
use hearth_db::models::community::Community;
use hearth_db::models::subscription::Subscription;
use hearth_db::repositories::{
    CommunityRepo, MembershipRepo, SecurityReportRepo, SubscriptionRepo, UserRepo,
};
use sqlx::PgConnection;

use crate::config::LifecycleConfig;

/// Demote the owner and every current member of the owner's community to
/// the floor role, recording pre-demotion roles into the snapshot.
///
/// Idempotent: entries already present in the snapshot are never
/// overwritten, and identities already at the floor are skipped, so a
/// second pass (e.g. a retried request) is a no-op.
pub async fn demote(conn: &mut PgConnection, sub: &Subscription) -> Result<(), sqlx::Error> {
    let mut snapshot = sub.snapshot().clone();
    let before = snapshot.clone();

    if let Some(owner) = UserRepo::lock_by_id(conn, sub.owner_id).await? {
        if !owner.role.is_floor() {
            snapshot.record_owner(owner.role);
            UserRepo::set_role(conn, owner.id, Role::FLOOR).await?;
        }
    }

    if let Some(community) = CommunityRepo::find_by_owner(conn, sub.owner_id).await? {
        for member in MembershipRepo::list_members(conn, community.id).await? {
            if member.role.is_floor() {
                continue;
            }
            snapshot.record_member(member.user_id, member.role);
            UserRepo::set_role(conn, member.user_id, Role::FLOOR).await?;
        }
    }

    if snapshot != before {
        SubscriptionRepo::save_snapshot(conn, sub.id, &snapshot).await?;
    }
    Ok(())
}

/// Restore the owner and current members from the snapshot, then clear it
/// so the next lapse episode starts fresh.
///
/// The owner falls back to `communityowner` when no snapshot entry exists.
/// A member at the floor with no snapshot entry is repaired by heuristic:
/// security if they ever filed a security report in this community (and
/// the policy allows inferring it), resident otherwise. The heuristic is
/// best-effort and logged as a warning. Members not at the floor (e.g.
/// promoted by a join during the lapse) are left untouched.
pub async fn restore(
    conn: &mut PgConnection,
    lifecycle: &LifecycleConfig,
    sub: &Subscription,
) -> Result<(), sqlx::Error> {
    let snapshot = sub.snapshot();

    let owner_role = snapshot.owner_role.unwrap_or(Role::CommunityOwner);
    UserRepo::set_role(conn, sub.owner_id, owner_role).await?;

    if let Some(community) = CommunityRepo::find_by_owner(conn, sub.owner_id).await? {
        for member in MembershipRepo::list_members(conn, community.id).await? {
            if !member.role.is_floor() {
                continue;
            }
            let role = match snapshot.member_role(member.user_id) {
                Some(recorded) => recorded,
                None => heuristic_role(conn, lifecycle, &community, member.user_id).await?,
            };
            UserRepo::set_role(conn, member.user_id, role).await?;
        }
    }

    if !snapshot.is_empty() {
        SubscriptionRepo::save_snapshot(conn, sub.id, &RoleSnapshot::default()).await?;
    }
    Ok(())
}

/// Best-effort role for a floor member with no snapshot entry.
async fn heuristic_role(
    conn: &mut PgConnection,
    lifecycle: &LifecycleConfig,
    community: &Community,
    user_id: DbId,
) -> Result<Role, sqlx::Error> {
    let role = if lifecycle.infer_security_on_restore
        && SecurityReportRepo::has_reported(conn, community.id, user_id).await?
    {
        Role::Security
    } else {
        Role::Resident
    };
    tracing::warn!(
        user_id,
        community_id = community.id,
        restored_role = %role,
        "No snapshot entry for member; restored via report-history heuristic"
    );
    Ok(role)
}

/// Membership-created hook: stamp the community address onto the new
/// member and guarantee the minimum member role.
///
/// Must run in the same transaction as the membership insert, so a member
/// row never exists without its role bump.
pub async fn on_membership_created(
    conn: &mut PgConnection,
    user_id: DbId,
    community: &Community,
) -> Result<(), sqlx::Error> {
    if let Some(address) = &community.address {
        UserRepo::set_address(conn, user_id, address).await?;
    }

    if let Some(user) = UserRepo::lock_by_id(conn, user_id).await? {
        if user.role.is_floor() {
            UserRepo::set_role(conn, user_id, Role::Resident).await?;
        }
    }
    Ok(())
}

/// Membership-destroyed hook: revert community-scoped roles to the floor.
///
/// Operates only on the role field -- it must stay correct even if the
/// identity was already re-added elsewhere, so no membership re-query.
pub async fn on_membership_destroyed(
    conn: &mut PgConnection,
    user_id: DbId,
) -> Result<(), sqlx::Error> {
    if let Some(user) = UserRepo::lock_by_id(conn, user_id).await? {
        if user.role.is_community_scoped() {
            UserRepo::set_role(conn, user_id, Role::FLOOR).await?;
        }
    }
    Ok(())
}
