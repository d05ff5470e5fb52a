//! `WebSocket` handler carrying the request/response protocol.
//!
//! Clients connect to `GET /ws`, send JSON-encoded requests as text
//! frames, and receive every broadcast response -- including responses
//! to requests issued by *other* peers, which is the shared-session
//! collaboration model. A request that parses but matches no verb, or a
//! frame that is not valid JSON at all, is answered directly on this
//! socket only.
//!
//! If a client falls behind, lagged broadcasts are silently skipped and
//! the client resumes from the most recent response.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use livebridge_protocol::{Request, Response};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::Envelope;
use crate::logfmt::{short_session, trim_payload};
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and join the
/// shared session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_bridge(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: register the session, pump the
/// broadcast channel outward, and forward inbound frames to the
/// dispatch task.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let session = Uuid::new_v4();
    state.sessions.add(session).await;

    let mut rx = state.subscribe();

    loop {
        tokio::select! {
            // Receive a response broadcast from the dispatcher.
            result = rx.recv() => {
                match result {
                    Ok(response) => {
                        if send_response(&mut socket, &response).await.is_err() {
                            debug!(session = %short_session(session), "client disconnected (send failed)");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(session = %short_session(session), skipped = n, "client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("broadcast channel closed, shutting down socket");
                        break;
                    }
                }
            }
            // An inbound frame from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_frame(&mut socket, &state, session, text.as_str()).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(session = %short_session(session), "client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(session = %short_session(session), error = %e, "websocket error");
                        break;
                    }
                    _ => {
                        // Ignore binary frames and pongs.
                    }
                }
            }
        }
    }

    state.sessions.remove(session).await;
}

/// Parse one text frame and route it through the dispatcher.
///
/// Returns `false` when the socket is no longer usable.
async fn handle_frame(
    socket: &mut WebSocket,
    state: &AppState,
    session: Uuid,
    text: &str,
) -> bool {
    let Ok(request) = serde_json::from_str::<Request>(text) else {
        debug!(
            session = %short_session(session),
            frame = %trim_payload(text),
            "unparseable frame"
        );
        return send_response(socket, &Response::invalid_request())
            .await
            .is_ok();
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let envelope = Envelope {
        session,
        request,
        reply: reply_tx,
    };
    if state.inbound.send(envelope).await.is_err() {
        warn!("dispatch task is gone, closing socket");
        return false;
    }

    // A direct reply arrives only for invalid requests; on the
    // broadcast path the slot is dropped and this resolves to Err.
    if let Ok(direct) = reply_rx.await {
        return send_response(socket, &direct).await.is_ok();
    }
    true
}

/// Serialize a response and send it as a text frame.
async fn send_response(socket: &mut WebSocket, response: &Response) -> Result<(), ()> {
    let json = match serde_json::to_string(response) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to serialize response");
            return Ok(());
        }
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}
