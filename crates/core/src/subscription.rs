//! Subscription status rules.
//!
//! The status value is stored as lowercase text with a CHECK constraint.
//! Expiry is only ever *applied* by the ledger's reconciliation path; the
//! helpers here are the pure decisions that path relies on.

use chrono::Months;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Grace period between a trial expiring and its data becoming deletable.
pub const TRIAL_GRACE_MONTHS: u32 = 1;

/// Lifecycle status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Parse a storage name back into a status.
    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Manual sqlx plumbing: the status lives in a plain TEXT column, so
// delegate to the `&str` implementations.

impl sqlx::Type<sqlx::Postgres> for SubscriptionStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for SubscriptionStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SubscriptionStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        SubscriptionStatus::parse(s).ok_or_else(|| format!("unknown status name: {s}").into())
    }
}

/// Whether reconciliation must flip an `active` subscription to `expired`.
///
/// Cancelled subscriptions with an expiry date are swept by the same rule;
/// cancelled subscriptions without one stay cancelled until explicitly
/// re-activated.
pub fn should_expire(
    status: SubscriptionStatus,
    expiry_date: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    match (status, expiry_date) {
        (SubscriptionStatus::Active, Some(expiry)) => expiry <= now,
        (SubscriptionStatus::Cancelled, Some(expiry)) => expiry <= now,
        _ => false,
    }
}

/// The post-reconciliation activity check: active status with no expiry
/// date, or one still in the future.
pub fn is_active_at(
    status: SubscriptionStatus,
    expiry_date: Option<Timestamp>,
    now: Timestamp,
) -> bool {
    status == SubscriptionStatus::Active && expiry_date.is_none_or(|expiry| expiry > now)
}

/// When an expired trial's data becomes deletable: one grace period after
/// the expiry was detected.
pub fn deletion_date_after(expired_at: Timestamp) -> Timestamp {
    expired_at + Months::new(TRIAL_GRACE_MONTHS)
}
