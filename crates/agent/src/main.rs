//! `vigil-agent` -- threshold alert execution daemon.
//!
//! Loads alert definitions from the backend, evaluates each one on its own
//! interval, and sends notify/resolve calls as alerts change severity.
//! Runs until SIGINT or SIGTERM.
//!
//! Configuration is read from the environment (optionally via `.env`);
//! see [`AgentConfig::from_env`] for the variables and defaults.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vigil_agent::config::AgentConfig;
use vigil_agent::supervisor::Supervisor;
use vigil_client::backend::AlertBackend;
use vigil_client::http::HttpAlertBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vigil_agent=info,vigil_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = AgentConfig::from_env().context("Invalid configuration")?;
    let retry = config
        .retry_policy()
        .context("Invalid retry configuration")?;

    tracing::info!(
        backend = %config.backend_address,
        request_timeout_secs = config.request_timeout.as_secs(),
        max_attempts = retry.config().max_attempts,
        jitter = retry.config().jitter,
        "Starting vigil-agent",
    );

    // --- Backend ---
    let backend: Arc<dyn AlertBackend> = Arc::new(
        HttpAlertBackend::new(&config.backend_address, config.request_timeout)
            .context("Failed to build HTTP client")?,
    );

    // --- Shutdown ---
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signal_cancel.cancel();
    });

    // --- Alert tasks ---
    let supervisor = match Supervisor::start(backend, retry, config.shutdown_grace, cancel).await {
        Ok(supervisor) => supervisor,
        Err(vigil_agent::supervisor::SupervisorError::Cancelled) => {
            tracing::info!("Shut down before alerts were loaded");
            return Ok(());
        }
        Err(e) => return Err(e).context("Startup failed"),
    };

    let report = supervisor.run().await;

    tracing::info!(
        finished = report.finished.len(),
        aborted = report.aborted.len(),
        panicked = report.panicked.len(),
        "Shutdown complete",
    );
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// If a handler cannot be installed the error is logged and that signal
/// is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
