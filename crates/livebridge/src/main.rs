//! Remote execution bridge binary.
//!
//! Wires together the execution context, the protocol dispatcher, the
//! WebSocket server, and the reload watcher. All connected clients
//! share exactly one context; every matched request's response is
//! broadcast to every peer.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `livebridge.yaml` (optional) and the
//!    positional CLI argument naming an extension script
//! 3. Build the initial execution context and its shared slot
//! 4. Spawn the dispatch task (the single owner of verb handling)
//! 5. Start the reload watcher, when a watch directory is configured
//! 6. Serve the WebSocket endpoint until terminated

mod config;
mod error;
mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use livebridge_context::{ContextSlot, ExecutionContext, ReloadController};
use livebridge_server::dispatch::{Dispatcher, run_dispatch};
use livebridge_server::{AppState, ServerConfig, start_server};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::watch::spawn_watcher;

/// Capacity of the inbound request channel toward the dispatch task.
const INBOUND_CAPACITY: usize = 64;

/// Application entry point for the bridge.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    // 2. Load configuration (before logging init: the debug flag
    //    decides the default filter).
    let config = BridgeConfig::load(std::path::Path::new("livebridge.yaml"))?;

    // 1. Initialize structured logging.
    let default_filter = if config.logging.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .init();

    info!("livebridge starting");

    // The positional CLI argument overrides the configured extension.
    let extension: Option<PathBuf> = std::env::args()
        .nth(1)
        .or_else(|| config.context.extension.clone())
        .map(PathBuf::from);
    match &extension {
        Some(path) => info!(extension = %path.display(), "extension script configured"),
        None => info!("no extension script configured"),
    }

    // 3. Build the initial execution context.
    let context = ExecutionContext::new(extension.as_deref())?;
    let slot = ContextSlot::new(context);
    info!("execution context initialized");

    // 4. Spawn the dispatch task.
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let state = Arc::new(AppState::new(inbound_tx, config.logging.debug));
    let dispatcher = Dispatcher::new(slot.clone());
    tokio::spawn(run_dispatch(
        inbound_rx,
        dispatcher,
        state.tx.clone(),
        config.logging.debug,
    ));
    info!("dispatch task started");

    // 5. Start the reload watcher, when configured.
    let _watcher = match &config.watch.dir {
        Some(dir) => {
            let (trigger_tx, mut trigger_rx) = mpsc::channel(1);
            let watcher = spawn_watcher(
                std::path::Path::new(dir),
                &config.watch.suffix,
                trigger_tx,
            )?;
            let controller = ReloadController::new(slot.clone(), extension.clone());
            tokio::spawn(async move {
                while trigger_rx.recv().await.is_some() {
                    if let Err(e) = controller.rebuild().await {
                        error!(error = %e, "context rebuild failed, keeping old context");
                    }
                }
            });
            info!(dir = %dir, suffix = %config.watch.suffix, "reload watcher started");
            Some(watcher)
        }
        None => None,
    };

    // 6. Serve.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    info!(host = %server_config.host, port = server_config.port, "server started");
    start_server(&server_config, state).await?;

    Ok(())
}
