//! Route definitions for the `/subscription` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::subscription;
use crate::state::AppState;

/// Routes mounted at `/subscription`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(subscription::get_subscription))
        .route("/trial", post(subscription::start_trial))
        .route("/activate", post(subscription::activate))
        .route("/cancel", post(subscription::cancel))
}
