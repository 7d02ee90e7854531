use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Subscription lifecycle policy knobs.
    pub lifecycle: LifecycleConfig,
}

/// Policy switches for the subscription lifecycle engine.
///
/// Both decisions are ambiguous in intent, so they are explicit
/// configuration rather than silent behavior.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// When `true`, `cancel` demotes the owner and members immediately.
    /// When `false` (default), roles are only touched once an elapsed
    /// `expiry_date` is detected by reconciliation.
    pub demote_on_cancel: bool,
    /// When `true` (default), restoring a member with no snapshot entry
    /// may infer the security role from report history. When `false`,
    /// such members always restore to resident.
    pub infer_security_on_restore: bool,
    /// Trial length in days when the client does not pass one.
    pub default_trial_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            demote_on_cancel: false,
            infer_security_on_restore: true,
            default_trial_days: 30,
        }
    }
}

impl LifecycleConfig {
    /// Load lifecycle policy from environment variables.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `DEMOTE_ON_CANCEL`          | `false` |
    /// | `INFER_SECURITY_ON_RESTORE` | `true`  |
    /// | `DEFAULT_TRIAL_DAYS`        | `30`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            demote_on_cancel: env_bool("DEMOTE_ON_CANCEL", defaults.demote_on_cancel),
            infer_security_on_restore: env_bool(
                "INFER_SECURITY_ON_RESTORE",
                defaults.infer_security_on_restore,
            ),
            default_trial_days: std::env::var("DEFAULT_TRIAL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_trial_days),
        }
    }
}

fn env_bool(var: &str, default: bool) -> bool {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            lifecycle: LifecycleConfig::from_env(),
        }
    }
}
