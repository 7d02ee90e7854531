//! Route definitions for the `/community` resource.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::community;
use crate::state::AppState;

/// Routes mounted at `/community`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(community::create_community))
        .route("/join", post(community::join_community))
        .route("/leave", post(community::leave_community))
        .route("/members", get(community::list_members))
        .route("/members/{id}", delete(community::remove_member))
        .route(
            "/reports",
            get(community::list_reports).post(community::file_report),
        )
}
