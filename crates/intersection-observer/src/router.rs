//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /health` -- liveness probe
/// - `GET /ws/intersection` -- `WebSocket` snapshot stream
/// - `GET /api/intersection` -- current snapshot
/// - `GET /api/signals/{id}` -- single signal
/// - `GET /api/plan` -- timing plan
///
/// CORS allows any origin so a dashboard served elsewhere can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/ws/intersection", get(ws::ws_intersection))
        .route("/api/intersection", get(handlers::get_intersection))
        .route("/api/signals/{id}", get(handlers::get_signal))
        .route("/api/plan", get(handlers::get_plan))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
