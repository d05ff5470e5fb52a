//! Top-level error type for the bridge binary.

use livebridge_context::ContextError;
use livebridge_server::ServerError;

use crate::config::ConfigError;
use crate::watch::WatchError;

/// Errors that abort bridge startup.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The initial execution context could not be built.
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    /// The HTTP server failed to bind or serve.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// The reload watcher could not be started.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),
}
