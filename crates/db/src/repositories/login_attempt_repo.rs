//! Repository for the `login_attempts` table.
//!
//! Wraps the pure throttle state machine from `hearth-core` in short
//! per-IP transactions. Each operation locks the IP's row (`FOR UPDATE`)
//! so concurrent attempts from the same address serialize; different IPs
//! never contend.

use hearth_core::throttle::{AttemptState, LockoutState};
use hearth_core::types::Timestamp;
use sqlx::{PgConnection, PgPool};

use crate::models::login_attempt::LoginAttempt;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "ip, attempts, last_attempt_at, is_blocked";

/// Provides the persisted login-throttle operations.
pub struct LoginAttemptRepo;

impl LoginAttemptRepo {
    /// Is this IP locked out right now?
    ///
    /// Performs time-based self-healing: a lapsed block is cleared and
    /// persisted before answering. This read is potentially a write;
    /// never assume it is a pure query.
    pub async fn check(
        pool: &PgPool,
        ip: &str,
        now: Timestamp,
    ) -> Result<LockoutState, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(row) = Self::lock_row(&mut tx, ip).await? else {
            // Never-seen IP: nothing to heal, nothing to create.
            return Ok(LockoutState::clear());
        };

        let mut state = row.state();
        if state.reconcile(now) {
            tracing::debug!(ip, "Login throttle window elapsed; block cleared");
            Self::store(&mut tx, ip, &state).await?;
        }
        tx.commit().await?;

        Ok(state.lockout(now))
    }

    /// Record a failed authentication attempt, creating the IP's row on
    /// first sight. Returns the resulting lockout state.
    pub async fn record_failure(
        pool: &PgPool,
        ip: &str,
        now: Timestamp,
    ) -> Result<LockoutState, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO login_attempts (ip, attempts, last_attempt_at, is_blocked)
             VALUES ($1, 0, $2, FALSE)
             ON CONFLICT (ip) DO NOTHING",
        )
        .bind(ip)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let row = Self::lock_row(&mut tx, ip)
            .await?
            .unwrap_or(LoginAttempt {
                ip: ip.to_string(),
                attempts: 0,
                last_attempt_at: now,
                is_blocked: false,
            });

        let mut state = row.state();
        let lockout = state.record_failure(now);
        Self::store(&mut tx, ip, &state).await?;
        tx.commit().await?;

        Ok(lockout)
    }

    /// Record a successful authentication: a success always clears any
    /// residual negative state for the IP. Single atomic statement, so no
    /// explicit transaction is needed.
    pub async fn record_success(pool: &PgPool, ip: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE login_attempts SET attempts = 0, is_blocked = FALSE WHERE ip = $1")
            .bind(ip)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Raw row fetch, for tests and diagnostics.
    pub async fn find(pool: &PgPool, ip: &str) -> Result<Option<LoginAttempt>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM login_attempts WHERE ip = $1");
        sqlx::query_as::<_, LoginAttempt>(&query)
            .bind(ip)
            .fetch_optional(pool)
            .await
    }

    async fn lock_row(
        conn: &mut PgConnection,
        ip: &str,
    ) -> Result<Option<LoginAttempt>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM login_attempts WHERE ip = $1 FOR UPDATE");
        sqlx::query_as::<_, LoginAttempt>(&query)
            .bind(ip)
            .fetch_optional(conn)
            .await
    }

    async fn store(
        conn: &mut PgConnection,
        ip: &str,
        state: &AttemptState,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE login_attempts
             SET attempts = $2, last_attempt_at = $3, is_blocked = $4
             WHERE ip = $1",
        )
        .bind(ip)
        .bind(state.attempts)
        .bind(state.last_attempt_at)
        .bind(state.is_blocked)
        .execute(conn)
        .await?;
        Ok(())
    }
}
