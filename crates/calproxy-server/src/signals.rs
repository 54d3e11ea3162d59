//! Shutdown signal handling.
//!
//! - SIGTERM/SIGINT: graceful shutdown (Ctrl+C only on non-Unix platforms)

use tracing::{info, warn};

/// Completes when the process is asked to shut down.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!("failed to install SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating shutdown"),
        _ = ctrl_c() => {}
    }
}

/// Completes when the process is asked to shut down.
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received SIGINT, initiating shutdown"),
        Err(e) => {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
