pub mod auth;
pub mod community;
pub mod health;
pub mod subscription;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                 register (public)
/// /auth/login                    login (public, IP-throttled)
/// /auth/refresh                  refresh (public)
/// /auth/logout                   logout (requires auth)
///
/// /subscription                  own ledger, reconciled (GET)
/// /subscription/trial            start or re-arm a trial (POST)
/// /subscription/activate         re-activate, restoring roles (POST)
/// /subscription/cancel           cancel (POST)
///
/// /community                     create community (POST, owner)
/// /community/join                redeem join code (POST)
/// /community/leave               leave community (POST)
/// /community/members             member list (GET, gated)
/// /community/members/{id}        remove member (DELETE, owner/admin)
/// /community/reports             file / list security reports (gated)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/subscription", subscription::router())
        .nest("/community", community::router())
}
