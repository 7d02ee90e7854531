//! Handlers for the `/subscription` resource.
//!
//! Thin wrappers over the ledger: every read reconciles first, and the
//! transition endpoints surface the engine's errors unchanged.

use axum::extract::State;
use axum::Json;
use hearth_core::error::CoreError;
use hearth_core::types::Timestamp;
use hearth_db::models::subscription::SubscriptionResponse;
use serde::Deserialize;

use crate::engine::ledger;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Longest trial a client may request, in days.
const MAX_TRIAL_DAYS: i64 = 365;

/// Request body for `POST /subscription/trial`.
#[derive(Debug, Deserialize)]
pub struct StartTrialRequest {
    /// Trial length in days; defaults to the configured trial length.
    pub days: Option<i64>,
}

/// Request body for `POST /subscription/activate`.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    /// New expiry date. Omit for an open-ended subscription.
    pub expiry_date: Option<Timestamp>,
}

/// GET /api/v1/subscription
///
/// The caller's own ledger, reconciled before it is read.
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<SubscriptionResponse>> {
    let sub = ledger::reconcile(&state.pool, user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "subscription",
            id: user.user_id,
        }))?;
    Ok(Json(sub.into()))
}

/// POST /api/v1/subscription/trial
///
/// Start or re-arm a trial. Promotes a guest caller to community owner.
pub async fn start_trial(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<StartTrialRequest>,
) -> AppResult<Json<SubscriptionResponse>> {
    let days = input
        .days
        .unwrap_or(state.config.lifecycle.default_trial_days);
    if !(1..=MAX_TRIAL_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "Trial length must be between 1 and {MAX_TRIAL_DAYS} days"
        )));
    }

    let sub = ledger::start_trial(&state.pool, &state.config.lifecycle, user.user_id, days).await?;
    Ok(Json(sub.into()))
}

/// POST /api/v1/subscription/activate
///
/// Re-activate a cancelled or expired subscription, restoring roles.
/// Deliberately open to demoted owners: their token role is `guest` by
/// the time they need this.
pub async fn activate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ActivateRequest>,
) -> AppResult<Json<SubscriptionResponse>> {
    let sub = ledger::activate(
        &state.pool,
        &state.config.lifecycle,
        user.user_id,
        input.expiry_date,
    )
    .await?;
    Ok(Json(sub.into()))
}

/// POST /api/v1/subscription/cancel
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<SubscriptionResponse>> {
    let sub = ledger::cancel(&state.pool, &state.config.lifecycle, user.user_id).await?;
    Ok(Json(sub.into()))
}
