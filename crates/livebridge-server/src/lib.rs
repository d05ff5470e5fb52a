//! Bridge server for the livebridge execution context.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) carrying the four-verb request
//!   protocol; every matched response is broadcast to all connected
//!   peers via [`tokio::sync::broadcast`], so each viewer observes
//!   every mutation performed by any client
//! - **Protocol dispatcher** running on a single task, consuming
//!   inbound requests strictly in arrival order -- the actor boundary
//!   that serializes all namespace access
//! - **Session registry** tracking connected peers for observability
//! - **Minimal HTML status page** (`GET /`) showing the session count
//!   and endpoint list
//!
//! # Architecture
//!
//! Each `WebSocket` task parses inbound frames into
//! [`Request`](livebridge_protocol::Request)s and forwards them to the
//! dispatch task through an mpsc channel, carrying a oneshot reply slot.
//! The dispatcher resolves the verb against the current execution
//! context, then either broadcasts the response to everyone (matched
//! verbs) or answers only the requester through the reply slot (the
//! `invalid request` error). A long-running evaluation blocks all other
//! requests for its duration; that is an accepted property of the
//! shared-session model, not a defect.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod logfmt;
pub mod router;
pub mod server;
pub mod sessions;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use dispatch::{Dispatcher, Envelope, run_dispatch};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use sessions::SessionRegistry;
pub use state::AppState;
