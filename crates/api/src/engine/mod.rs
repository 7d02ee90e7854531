//! The access & subscription lifecycle engine.
//!
//! Three cooperating pieces:
//!
//! - [`ledger`] owns subscription state transitions. Every transition runs
//!   inside a transaction that first row-locks the subscription, so
//!   reconciliation is serialized per subscription identity.
//! - [`roles`] mutates user roles on demotion, restore, and membership
//!   events, guarding the pre-demotion snapshot against overwrites.
//! - [`gate`] is the façade privileged handlers consult: reconcile
//!   lazily, then answer allow/deny with a user-facing reason.

pub mod gate;
pub mod ledger;
pub mod roles;

use std::future::Future;

use hearth_core::error::CoreError;

use crate::error::AppError;

/// Attempts per serialized operation before giving up.
const MAX_TX_ATTEMPTS: u32 = 3;

/// Postgres codes worth retrying: serialization failure and deadlock.
fn is_retryable(err: &AppError) -> bool {
    match err {
        AppError::Database(sqlx::Error::Database(db)) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

/// Run a transactional operation, transparently retrying transient
/// conflicts. Exhausted retries surface as [`CoreError::Transient`] so the
/// caller sees "try again", never a silent no-op.
pub(crate) async fn with_tx_retry<T, F, Fut>(op_name: &'static str, f: F) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut last_err = None;
    for attempt in 1..=MAX_TX_ATTEMPTS {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                tracing::warn!(op = op_name, attempt, error = %err, "Retrying transient conflict");
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    tracing::error!(op = op_name, attempts = MAX_TX_ATTEMPTS, error = ?last_err, "Retry budget exhausted");
    Err(AppError::Core(CoreError::Transient(format!(
        "{op_name} hit concurrent updates; please try again"
    ))))
}
