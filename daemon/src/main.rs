//! hotkey-sync-daemon: keeps hotkey preferences, live bindings and open
//! windows consistent
//!
//! This daemon provides:
//! - Accelerator grammar (validation, normalization, display)
//! - Authoritative hotkey registry backed by a JSON settings file
//! - Live binding of enabled hotkeys
//! - IPC server for windows to query, mutate and subscribe to changes
//!
//! Every mutation runs persist -> rebind -> broadcast.

mod accelerator;
mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod state;
mod store;
mod sync;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::hotkey::TrackingBinder;
use crate::ipc::{Handlers, Server};
use crate::lifecycle::ShutdownSignal;
use crate::state::HotkeyRegistry;
use crate::store::JsonFileStore;
use crate::sync::SyncHub;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "hotkey-sync-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, ?config.settings_path, platform = %config.platform, "configuration loaded");

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Collaborators: persisted preferences, live bindings, window fan-out
    let store = Arc::new(
        JsonFileStore::open(&config.settings_path).context("failed to open settings store")?,
    );
    info!(path = ?store.path(), "settings store ready");
    let binder = Arc::new(TrackingBinder::new());
    let hub = Arc::new(SyncHub::new());

    // Materialize the registry and push enabled hotkeys in one batch
    let registry = Arc::new(HotkeyRegistry::load(store, binder, Arc::clone(&hub)).await);

    let handlers = Arc::new(Handlers::new(Arc::clone(&registry), config.platform));
    let server = Server::new(&config.socket_path, handlers, hub)?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the IPC server (accepts window connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;

    info!("hotkey-sync-daemon stopped");

    Ok(())
}
