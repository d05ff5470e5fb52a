//! Integration tests for the HTTP surface.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use livebridge_server::build_router;
use livebridge_server::state::AppState;
use tokio::sync::mpsc;
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    let (inbound, _rx) = mpsc::channel(16);
    Arc::new(AppState::new(inbound, false))
}

#[tokio::test]
async fn index_returns_html_status_page() {
    let router = build_router(make_state());

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("livebridge"));
    assert!(html.contains("Connected sessions: 0"));
}

#[tokio::test]
async fn ws_route_requires_an_upgrade() {
    let router = build_router(make_state());

    // A plain GET without upgrade headers must not be a 404; the route
    // exists and rejects the non-upgrade request.
    let response = router
        .oneshot(Request::get("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
    assert_ne!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let router = build_router(make_state());

    let response = router
        .oneshot(Request::get("/api/nothing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
