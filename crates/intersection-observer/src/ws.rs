//! `WebSocket` handler for real-time snapshot streaming.
//!
//! Clients connect to `GET /ws/intersection`. The first frame is the
//! current snapshot, so a viewer that joins mid-cycle renders immediately
//! instead of waiting for the next tick. After that, every snapshot the
//! engine broadcasts is forwarded as a JSON text frame.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent snapshot.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use intersection_types::IntersectionSnapshot;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming snapshots.
///
/// # Route
///
/// `GET /ws/intersection`
pub async fn ws_intersection(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Serialize a snapshot into a text frame. `None` if serialization fails,
/// which is logged and the frame dropped.
fn to_frame(snapshot: &IntersectionSnapshot) -> Option<Message> {
    match serde_json::to_string(snapshot) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!(error = %e, "Failed to serialize snapshot");
            None
        }
    }
}

/// Handle the `WebSocket` lifecycle: subscribe, send the current
/// snapshot, then forward each broadcast until either side goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let (mut rx, initial) = state.attach();
    debug!(phase = %initial.current_phase, "WebSocket client connected");

    let sent = match to_frame(&initial) {
        Some(frame) => socket.send(frame).await.is_ok(),
        None => true,
    };
    if !sent {
        debug!("WebSocket client disconnected before initial snapshot");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(snapshot) => {
                        let Some(frame) = to_frame(&snapshot) else {
                            continue;
                        };
                        if socket.send(frame).await.is_err() {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "WebSocket error");
                        return;
                    }
                    // Viewers are read-only; anything else they send is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use intersection_core::clock::IntersectionClock;
    use intersection_core::plan::TimingPlan;

    use super::*;

    #[test]
    fn frame_is_camel_case_json() {
        let plan = TimingPlan::axis(20, 2).unwrap();
        let clock = IntersectionClock::new(Arc::new(plan));
        let text = to_frame(&clock.snapshot()).unwrap().into_text().unwrap();
        let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(json["currentPhase"], "NS_Green");
        assert_eq!(json["phaseSecondsRemaining"], 20);
        assert_eq!(json["signals"][0]["lightState"], "Green");
    }
}
