//! Session registry: which peers are currently connected.
//!
//! Purely observability -- the registry feeds the status page and the
//! connect/disconnect log lines and is never consulted by dispatch.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::logfmt::short_session;

/// Set of currently connected peer identifiers.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<BTreeSet<Uuid>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly connected peer.
    pub async fn add(&self, session: Uuid) {
        self.inner.write().await.insert(session);
        debug!(session = %short_session(session), "connected");
    }

    /// Record a disconnected peer.
    pub async fn remove(&self, session: Uuid) {
        self.inner.write().await.remove(&session);
        debug!(session = %short_session(session), "disconnected");
    }

    /// Number of currently connected peers.
    pub async fn count(&self) -> usize {
        self.inner.read().await.len()
    }
}
