//! Subscription entity model.

use hearth_core::snapshot::RoleSnapshot;
use hearth_core::subscription::SubscriptionStatus;
use hearth_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A subscription row from the `subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub owner_id: DbId,
    pub status: SubscriptionStatus,
    pub is_trial: bool,
    pub start_date: Timestamp,
    pub expiry_date: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub trial_expired_at: Option<Timestamp>,
    /// When the expired trial's data becomes deletable (expiry + grace).
    pub data_deletion_date: Option<Timestamp>,
    /// Set once by the sweep; its presence is what makes deletion exactly-once.
    pub data_deleted_at: Option<Timestamp>,
    /// Role snapshot for the current lapse episode. Empty outside a lapse.
    pub original_roles: Json<RoleSnapshot>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// The snapshot for the current lapse episode.
    pub fn snapshot(&self) -> &RoleSnapshot {
        &self.original_roles.0
    }
}

/// Public subscription representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionResponse {
    pub status: SubscriptionStatus,
    pub is_trial: bool,
    pub start_date: Timestamp,
    pub expiry_date: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub data_deletion_date: Option<Timestamp>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(sub: Subscription) -> Self {
        Self {
            status: sub.status,
            is_trial: sub.is_trial,
            start_date: sub.start_date,
            expiry_date: sub.expiry_date,
            cancelled_at: sub.cancelled_at,
            data_deletion_date: sub.data_deletion_date,
        }
    }
}
