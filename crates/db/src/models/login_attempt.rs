//! Login-attempt record, keyed by client IP.

use hearth_core::throttle::AttemptState;
use hearth_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `login_attempts` table.
#[derive(Debug, Clone, FromRow)]
pub struct LoginAttempt {
    pub ip: String,
    pub attempts: i32,
    pub last_attempt_at: Timestamp,
    pub is_blocked: bool,
}

impl LoginAttempt {
    /// View the row as the pure throttle state machine.
    pub fn state(&self) -> AttemptState {
        AttemptState {
            attempts: self.attempts,
            last_attempt_at: self.last_attempt_at,
            is_blocked: self.is_blocked,
        }
    }
}
