//! The access gate consulted by every community-scoped handler.

use chrono::Utc;
use hearth_core::error::CoreError;
use hearth_core::roles::Role;
use hearth_core::subscription::is_active_at;
use hearth_core::types::DbId;
use hearth_db::repositories::{CommunityRepo, MembershipRepo, UserRepo};
use sqlx::PgPool;

use crate::engine::ledger;
use crate::error::{AppError, AppResult};

/// Shown to principals with neither a ledger nor a membership, and to
/// principals whose community has vanished underneath them.
pub const REASON_NOT_A_MEMBER: &str = "You are not a member of any community";
/// Shown to owners whose own subscription is not active.
pub const REASON_OWN_SUBSCRIPTION_EXPIRED: &str = "Your subscription has expired";
/// Shown to members whose community owner's subscription is not active.
pub const REASON_OWNER_SUBSCRIPTION_EXPIRED: &str =
    "Your community owner's subscription has expired";

/// The gate's verdict, with a user-facing reason on denial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<&'static str>,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: &'static str) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }

    /// Turn a denial into a 403 carrying the reason.
    pub fn require(self) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                self.reason.unwrap_or(REASON_NOT_A_MEMBER).to_string(),
            )))
        }
    }
}

/// May this principal use community-scoped features right now?
///
/// Reconciles the relevant ledger lazily before answering, so a freshly
/// elapsed expiry is applied (and its demotion cascade run) on the way
/// through. The role is read from the database, not the token -- a
/// demotion must bite on the very next request.
///
/// A missing ledger or vanished community is a configuration problem and
/// answers "no access"; it never crashes the request.
pub async fn check_community_access(pool: &PgPool, user_id: DbId) -> AppResult<AccessDecision> {
    let Some(user) = UserRepo::find_by_id(pool, user_id).await? else {
        return Ok(AccessDecision::deny(REASON_NOT_A_MEMBER));
    };

    if user.role == Role::Admin {
        return Ok(AccessDecision::allow());
    }

    // Principals with a ledger of their own are judged by it, whatever
    // their current (possibly demoted) role.
    if let Some(sub) = ledger::reconcile(pool, user_id).await? {
        return Ok(
            if is_active_at(sub.status, sub.expiry_date, Utc::now()) {
                AccessDecision::allow()
            } else {
                AccessDecision::deny(REASON_OWN_SUBSCRIPTION_EXPIRED)
            },
        );
    }

    // Everyone else is judged by their community owner's ledger.
    let Some(membership) = MembershipRepo::find_by_user(pool, user_id).await? else {
        return Ok(AccessDecision::deny(REASON_NOT_A_MEMBER));
    };
    let Some(community) = CommunityRepo::find_by_id(pool, membership.community_id).await? else {
        return Ok(AccessDecision::deny(REASON_NOT_A_MEMBER));
    };

    match ledger::reconcile(pool, community.owner_id).await? {
        Some(sub) if is_active_at(sub.status, sub.expiry_date, Utc::now()) => {
            Ok(AccessDecision::allow())
        }
        _ => Ok(AccessDecision::deny(REASON_OWNER_SUBSCRIPTION_EXPIRED)),
    }
}
