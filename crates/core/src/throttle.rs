//! Login-throttle state machine, keyed by client IP.
//!
//! The decision logic is pure and clock-injected; persistence and per-IP
//! serialization belong to the database layer. Every operation that reads
//! the state may also mutate it (time-based self-healing), so callers must
//! never treat a lockout check as a pure query.

use chrono::Duration;

use crate::types::Timestamp;

/// Consecutive failures before an IP is blocked.
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Lockout window in minutes.
pub const LOCKOUT_WINDOW_MINS: i64 = 5;

/// The fixed lockout window.
pub fn lockout_window() -> Duration {
    Duration::minutes(LOCKOUT_WINDOW_MINS)
}

/// Answer to "is this IP locked out right now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutState {
    pub locked: bool,
    /// Time left until the block lifts. Zero when not locked.
    pub remaining: Duration,
}

impl LockoutState {
    /// An unlocked state with no remaining wait.
    pub fn clear() -> Self {
        Self {
            locked: false,
            remaining: Duration::zero(),
        }
    }

    /// Remaining wait in whole seconds, for user-facing messages.
    /// Computed freshly at view time, never cached.
    pub fn remaining_secs(&self) -> i64 {
        self.remaining.num_seconds().max(0)
    }
}

/// Mutable per-IP attempt state, mirroring a `login_attempts` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    pub attempts: i32,
    pub last_attempt_at: Timestamp,
    pub is_blocked: bool,
}

impl AttemptState {
    /// Fresh state for an IP seen for the first time.
    pub fn new(now: Timestamp) -> Self {
        Self {
            attempts: 0,
            last_attempt_at: now,
            is_blocked: false,
        }
    }

    /// Time-based self-healing: if blocked but the window has elapsed
    /// since the last attempt, clear the block and reset the counter.
    ///
    /// Returns `true` when the state was mutated and must be persisted.
    pub fn reconcile(&mut self, now: Timestamp) -> bool {
        if self.is_blocked && now - self.last_attempt_at >= lockout_window() {
            self.is_blocked = false;
            self.attempts = 0;
            return true;
        }
        false
    }

    /// Current lockout answer. Callers should [`reconcile`](Self::reconcile)
    /// first so a lapsed block never reports as locked.
    pub fn lockout(&self, now: Timestamp) -> LockoutState {
        if !self.is_blocked {
            return LockoutState::clear();
        }
        let elapsed = now - self.last_attempt_at;
        let remaining = lockout_window() - elapsed;
        if remaining <= Duration::zero() {
            LockoutState::clear()
        } else {
            LockoutState {
                locked: true,
                remaining,
            }
        }
    }

    /// Register a failed authentication attempt.
    ///
    /// Increments the counter and blocks at the threshold. Once blocked the
    /// state saturates: further failures neither grow the counter nor move
    /// `last_attempt_at`, so the window is anchored at the blocking attempt.
    pub fn record_failure(&mut self, now: Timestamp) -> LockoutState {
        self.reconcile(now);

        if self.is_blocked {
            return self.lockout(now);
        }

        self.attempts += 1;
        self.last_attempt_at = now;
        if self.attempts >= MAX_FAILED_ATTEMPTS {
            self.is_blocked = true;
        }
        self.lockout(now)
    }

    /// Register a successful authentication.
    ///
    /// A success always wins over any residual negative state for the IP.
    pub fn record_success(&mut self) {
        self.attempts = 0;
        self.is_blocked = false;
    }
}
