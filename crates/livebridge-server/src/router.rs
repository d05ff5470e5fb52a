//! Axum router construction for the bridge server.
//!
//! Assembles the status page and the `WebSocket` endpoint into a single
//! [`Router`] with CORS middleware enabled so browser-hosted dashboards
//! can connect from any origin during development.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the bridge server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- the `WebSocket` request/response channel
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws", get(ws::ws_bridge))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
