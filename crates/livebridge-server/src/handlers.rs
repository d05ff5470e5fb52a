//! HTTP endpoint handlers for the bridge server.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::state::AppState;

/// Serve a minimal HTML page showing server status and the protocol
/// endpoint.
///
/// # Route
///
/// `GET /`
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions = state.sessions.count().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>livebridge</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 640px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        code {{ background: #161b22; border: 1px solid #30363d; border-radius: 4px; padding: 0.1rem 0.4rem; }}
    </style>
</head>
<body>
    <h1>livebridge</h1>
    <p class="subtitle">Remote execution bridge</p>
    <p>Status: <span class="status">RUNNING</span></p>
    <p>Connected sessions: {sessions}</p>
    <p>Protocol endpoint: <code>GET /ws</code> (WebSocket, JSON requests with one of
       <code>call</code> / <code>eval</code> / <code>get</code> / <code>set</code>)</p>
</body>
</html>"#
    ))
}
