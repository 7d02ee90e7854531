//! Handlers for the `/community` resource: creation, membership, member
//! management, and security reports.
//!
//! Every community-scoped read/write consults the access gate first; the
//! membership mutations call the role coordinator hooks inside the same
//! transaction as the membership row change.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use hearth_core::error::CoreError;
use hearth_core::roles::Role;
use hearth_core::types::DbId;
use hearth_db::models::community::{Community, CreateCommunity};
use hearth_db::models::membership::Membership;
use hearth_db::models::security_report::{CreateSecurityReport, SecurityReport};
use hearth_db::repositories::membership_repo::CommunityMember;
use hearth_db::repositories::{CommunityRepo, MembershipRepo, SecurityReportRepo};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use validator::Validate;

use crate::engine::{gate, ledger, roles};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOwner;
use crate::state::AppState;

/// Length of generated join codes.
const JOIN_CODE_LEN: usize = 8;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /community`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommunityRequest {
    #[validate(length(min = 3, max = 80))]
    pub name: String,
    pub address: Option<String>,
}

/// Request body for `POST /community/join`.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub join_code: String,
}

/// Request body for `POST /community/reports`.
#[derive(Debug, Deserialize, Validate)]
pub struct FileReportRequest {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/community
///
/// Create the caller's community. Requires an active subscription.
pub async fn create_community(
    State(state): State<AppState>,
    RequireOwner(user): RequireOwner,
    Json(input): Json<CreateCommunityRequest>,
) -> AppResult<(StatusCode, Json<Community>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    if !ledger::is_active(&state.pool, user.user_id).await? {
        return Err(AppError::Core(CoreError::Forbidden(
            gate::REASON_OWN_SUBSCRIPTION_EXPIRED.to_string(),
        )));
    }

    let community = CommunityRepo::create(
        &state.pool,
        &CreateCommunity {
            owner_id: user.user_id,
            name: input.name,
            address: input.address,
            join_code: generate_join_code(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(community)))
}

/// POST /api/v1/community/join
///
/// Redeem a join code. Replaces any existing membership atomically and
/// runs the membership-created hook (address stamp + resident bump) in
/// the same transaction.
pub async fn join_community(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<JoinRequest>,
) -> AppResult<(StatusCode, Json<Membership>)> {
    let community = CommunityRepo::find_by_join_code(&state.pool, &input.join_code)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Validation("Invalid join code".into())))?;

    if community.owner_id == user.user_id {
        return Err(AppError::Core(CoreError::Conflict(
            "You already own this community".into(),
        )));
    }

    let mut tx = state.pool.begin().await?;
    let membership = MembershipRepo::upsert(&mut tx, user.user_id, community.id).await?;
    roles::on_membership_created(&mut tx, user.user_id, &community).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = user.user_id,
        community_id = community.id,
        "Member joined community"
    );
    Ok((StatusCode::CREATED, Json(membership)))
}

/// POST /api/v1/community/leave
///
/// Destroy the caller's membership. The role-reversion side effect is an
/// explicit call here, not a hidden hook.
pub async fn leave_community(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<StatusCode> {
    remove_membership(&state, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/community/members/{id}
///
/// Owner (or admin) removes a member from their community.
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(member_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let membership = MembershipRepo::find_by_user(&state.pool, member_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "membership",
            id: member_id,
        }))?;

    let community = CommunityRepo::find_by_id(&state.pool, membership.community_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "community",
            id: membership.community_id,
        }))?;

    if user.role != Role::Admin && community.owner_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only the community owner may remove members".into(),
        )));
    }

    remove_membership(&state, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/community/members
///
/// Member list, gated on live subscription state.
pub async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<CommunityMember>>> {
    gate::check_community_access(&state.pool, user.user_id)
        .await?
        .require()?;

    let community = resolve_community(&state, user.user_id).await?;
    let mut conn = state.pool.acquire().await?;
    let members = MembershipRepo::list_members(&mut conn, community.id).await?;
    Ok(Json(members))
}

/// POST /api/v1/community/reports
///
/// File a security report in the caller's community.
pub async fn file_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<FileReportRequest>,
) -> AppResult<(StatusCode, Json<SecurityReport>)> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    gate::check_community_access(&state.pool, user.user_id)
        .await?
        .require()?;

    let community = resolve_community(&state, user.user_id).await?;
    let report = SecurityReportRepo::create(
        &state.pool,
        &CreateSecurityReport {
            community_id: community.id,
            reporter_id: user.user_id,
            subject: input.subject,
            body: input.body,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /api/v1/community/reports
pub async fn list_reports(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<SecurityReport>>> {
    gate::check_community_access(&state.pool, user.user_id)
        .await?
        .require()?;

    let community = resolve_community(&state, user.user_id).await?;
    let reports = SecurityReportRepo::list_by_community(&state.pool, community.id).await?;
    Ok(Json(reports))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Delete a membership and run the destroyed hook in one transaction.
async fn remove_membership(state: &AppState, user_id: DbId) -> AppResult<()> {
    let mut tx = state.pool.begin().await?;
    let removed = MembershipRepo::delete_by_user(&mut tx, user_id).await?;
    if !removed {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "membership",
            id: user_id,
        }));
    }
    roles::on_membership_destroyed(&mut tx, user_id).await?;
    tx.commit().await?;

    tracing::info!(user_id, "Membership destroyed; role reverted if scoped");
    Ok(())
}

/// The community the caller belongs to: their own if they are an owner,
/// otherwise the one their membership points at.
async fn resolve_community(state: &AppState, user_id: DbId) -> AppResult<Community> {
    let mut conn = state.pool.acquire().await?;
    if let Some(own) = CommunityRepo::find_by_owner(&mut conn, user_id).await? {
        return Ok(own);
    }
    drop(conn);

    let membership = MembershipRepo::find_by_user(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "membership",
            id: user_id,
        }))?;

    CommunityRepo::find_by_id(&state.pool, membership.community_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "community",
            id: membership.community_id,
        }))
}

/// Random alphanumeric join code.
fn generate_join_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(JOIN_CODE_LEN)
        .map(char::from)
        .collect()
}
