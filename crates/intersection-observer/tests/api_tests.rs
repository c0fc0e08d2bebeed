//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, except for the startup and `WebSocket` tests
//! which bind an ephemeral port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::StreamExt;
use intersection_core::clock::IntersectionClock;
use intersection_core::config::PlanConfig;
use intersection_observer::router::build_router;
use intersection_observer::server::ServerConfig;
use intersection_observer::spawn_observer;
use intersection_observer::state::AppState;
use intersection_types::IntersectionSnapshot;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default configuration: four signals, 3 s pre-green, 45 s green.
fn make_test_state() -> Arc<AppState> {
    let plan = PlanConfig::default().build_plan().unwrap();
    let clock = Arc::new(IntersectionClock::new(Arc::new(plan)));
    Arc::new(AppState::new(clock))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(state: Arc<AppState>, path: &str) -> (StatusCode, Body) {
    let response = build_router(state)
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, response.into_body())
}

/// Read the next text frame and decode it as a snapshot.
async fn next_snapshot(ws: &mut WsClient) -> IntersectionSnapshot {
    let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    serde_json::from_str(message.to_text().unwrap()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state();
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("L1_PreGreen"));
    assert!(html.contains("North Approach"));
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get(make_test_state(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body_to_json(body).await["status"], "ok");
}

#[tokio::test]
async fn test_get_intersection_initial() {
    let (status, body) = get(make_test_state(), "/api/intersection").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["currentPhase"], "L1_PreGreen");
    assert_eq!(json["phaseSecondsRemaining"], 3);
    assert_eq!(json["totalPhaseDuration"], 3);
    assert_eq!(json["cyclePositionSeconds"], 0);
    assert!(json["generatedAt"].is_string());

    let signals = json["signals"].as_array().unwrap();
    assert_eq!(signals.len(), 4);
    assert_eq!(signals[0]["lightState"], "Yellow");
    assert_eq!(signals[0]["isPreGreen"], true);
    assert_eq!(signals[1]["lightState"], "Red");
    // Rest of L1_PreGreen plus all of L1_Green.
    assert_eq!(signals[1]["waitingTimeSeconds"], 48);
}

#[tokio::test]
async fn test_get_intersection_reflects_ticks() {
    let state = make_test_state();
    for _ in 0..3 {
        state.clock.tick();
    }

    let (_, body) = get(state, "/api/intersection").await;
    let json = body_to_json(body).await;
    assert_eq!(json["currentPhase"], "L1_Green");
    assert_eq!(json["phaseSecondsRemaining"], 45);
    assert_eq!(json["signals"][0]["lightState"], "Green");
    assert_eq!(json["signals"][1]["waitingTimeSeconds"], 45);
}

#[tokio::test]
async fn test_get_signal_by_id() {
    let (status, body) = get(make_test_state(), "/api/signals/L3").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["id"], "L3");
    assert_eq!(json["laneName"], "South Approach");
    assert_eq!(json["position"], "South");
    assert_eq!(json["lightState"], "Red");
    assert_eq!(json["phaseSecondsRemaining"], 0);
}

#[tokio::test]
async fn test_get_signal_not_found() {
    let (status, body) = get(make_test_state(), "/api/signals/L9").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json = body_to_json(body).await;
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("L9"));
}

#[tokio::test]
async fn test_get_plan() {
    let (status, body) = get(make_test_state(), "/api/plan").await;
    assert_eq!(status, StatusCode::OK);

    let json = body_to_json(body).await;
    assert_eq!(json["phases"].as_array().unwrap().len(), 8);
    assert_eq!(json["phases"][0]["id"], "L1_PreGreen");
    assert_eq!(json["phases"][1]["durationSeconds"], 45);
    assert_eq!(json["signals"].as_array().unwrap().len(), 4);
    assert_eq!(json["policy"]["kind"], "plain");
    assert_eq!(json["cycleDurationSeconds"], 192);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, _) = get(make_test_state(), "/api/agents").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spawn_observer_serves_over_tcp() {
    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let handle = spawn_observer(&config, make_test_state()).await.unwrap();

    let mut stream = tokio::net::TcpStream::connect(handle.addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains(r#"{"status":"ok"}"#));

    handle.task.abort();
}

#[tokio::test]
async fn test_spawn_observer_reports_bind_failure() {
    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let first = spawn_observer(&config, make_test_state()).await.unwrap();

    let taken = ServerConfig {
        host: String::from("127.0.0.1"),
        port: first.addr.port(),
    };
    assert!(spawn_observer(&taken, make_test_state()).await.is_err());

    first.task.abort();
}

#[tokio::test]
async fn test_ws_late_joiner_gets_current_snapshot_then_ticks() {
    let state = make_test_state();
    // Join mid-phase: 3 s of L1_PreGreen plus 2 s into L1_Green.
    for _ in 0..5 {
        state.clock.tick();
    }

    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let handle = spawn_observer(&config, Arc::clone(&state)).await.unwrap();
    let url = format!("ws://{}/ws/intersection", handle.addr);
    let (mut ws, _) = tokio_tungstenite::connect_async(url).await.unwrap();

    let initial = next_snapshot(&mut ws).await;
    assert_eq!(initial.current_phase, "L1_Green");
    assert_eq!(initial.phase_seconds_remaining, 43);
    assert!(initial.same_state(&state.current()));

    // The handler subscribed before sending the first frame, so this
    // broadcast reaches the client.
    let ticked = state.clock.tick();
    assert_eq!(state.broadcast(&ticked), 1);

    let next = next_snapshot(&mut ws).await;
    assert_eq!(next, ticked);
    assert_eq!(next.phase_seconds_remaining, 42);

    handle.task.abort();
}
