//! Shared application state for the bridge server.
//!
//! [`AppState`] holds the broadcast channel that fans responses out to
//! every connected `WebSocket` client, the inbound channel toward the
//! dispatch task, and the session registry.

use livebridge_protocol::Response;
use tokio::sync::{broadcast, mpsc};

use crate::dispatch::Envelope;
use crate::sessions::SessionRegistry;

/// Capacity of the broadcast channel for responses.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. The broadcast sender pushes responses to all connected
/// `WebSocket` clients; the inbound sender feeds the single dispatch
/// task.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for response messages.
    pub tx: broadcast::Sender<Response>,
    /// Channel toward the dispatch task.
    pub inbound: mpsc::Sender<Envelope>,
    /// Connected peer set (observability only).
    pub sessions: SessionRegistry,
    /// Whether per-request/per-response event logging is enabled.
    pub debug: bool,
}

impl AppState {
    /// Create application state around an inbound dispatch channel.
    pub fn new(inbound: mpsc::Sender<Envelope>, debug: bool) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            inbound,
            sessions: SessionRegistry::new(),
            debug,
        }
    }

    /// Subscribe to the response broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Response> {
        self.tx.subscribe()
    }
}
