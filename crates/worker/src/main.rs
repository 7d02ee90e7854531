//! Sweep worker entrypoint: runs the trial data-deletion sweep on a
//! fixed interval until SIGINT/SIGTERM.

use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth_worker::sweep;

/// Default time between sweep runs: once a day.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = hearth_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    hearth_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    let interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

    // Audit mode: report candidates without deleting anything.
    let dry_run: bool = std::env::var("SWEEP_DRY_RUN")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    tracing::info!(interval_secs, dry_run, "Sweep worker started");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Sweep worker stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = sweep::run_sweep(&pool, dry_run).await {
                    tracing::error!(error = %e, "Sweep run failed");
                }
            }
        }
    }

    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
