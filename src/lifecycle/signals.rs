//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to internal events
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP triggers a route table reload, not shutdown

use crate::lifecycle::shutdown::Shutdown;
use crate::reload::ReloadHandle;

/// Wait for signals until one of them asks for shutdown.
pub async fn handle_signals(shutdown: Shutdown, reload: ReloadHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut terminate, mut hangup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
            (Ok(terminate), Ok(hangup)) => (terminate, hangup),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(error = %e, "Failed to install signal handlers, only Ctrl-C will stop the router");
                wait_for_ctrl_c().await;
                shutdown.trigger();
                return;
            }
        };

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down");
                    break;
                }
                _ = terminate.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = hangup.recv() => {
                    tracing::info!("Received SIGHUP, reloading route table");
                    if !reload.request() {
                        tracing::warn!("Route refresher is not running, SIGHUP ignored");
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = reload;
        wait_for_ctrl_c().await;
        tracing::info!("Received Ctrl-C, shutting down");
    }

    shutdown.trigger();
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
