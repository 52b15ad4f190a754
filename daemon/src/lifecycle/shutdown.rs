//! Signal handling for graceful shutdown

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error};

/// Handles shutdown signals (SIGTERM, SIGINT)
#[derive(Debug, Default)]
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal.
    ///
    /// Falls back to Ctrl-C alone if SIGTERM cannot be registered.
    pub async fn wait(&self) {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!(?e, "failed to register SIGTERM handler");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(?e, "failed to wait for Ctrl-C");
                    std::future::pending::<()>().await;
                }
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => debug!("received SIGINT"),
                    Err(e) => error!(?e, "failed to wait for SIGINT"),
                }
            }
        }
    }
}
