//! Observer API server for the intersection controller.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/intersection`) pushing a fresh
//!   [`IntersectionSnapshot`] every tick via [`tokio::sync::broadcast`].
//!   A client receives the current snapshot as soon as it connects.
//! - **REST endpoints** for the current snapshot, a single signal, and
//!   the static timing plan.
//! - **Minimal HTML page** (`GET /`) showing the active phase and every
//!   signal's light.
//!
//! # Architecture
//!
//! The observer holds the shared [`IntersectionClock`] and never mutates
//! it. REST reads call `snapshot()` directly, so they always reflect the
//! latest tick. Pushes originate from the engine's tick callback, which
//! calls [`AppState::broadcast`].
//!
//! [`IntersectionSnapshot`]: intersection_types::IntersectionSnapshot
//! [`IntersectionClock`]: intersection_core::clock::IntersectionClock

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverHandle, StartupError, spawn_observer};
pub use state::AppState;
