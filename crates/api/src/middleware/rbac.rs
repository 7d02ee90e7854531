//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does
//! not meet the minimum requirement. These gate on the *token* role;
//! community-scoped endpoints additionally run the access gate, which
//! checks live subscription state.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hearth_core::error::CoreError;
use hearth_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires `communityowner` or `admin`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn owner_only(RequireOwner(user): RequireOwner) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireOwner(pub AuthUser);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin && user.role != Role::CommunityOwner {
            return Err(AppError::Core(CoreError::Forbidden(
                "Community owner role required".into(),
            )));
        }
        Ok(RequireOwner(user))
    }
}
