//! Shared wire types for the intersection controller.
//!
//! This crate is the single source of truth for every value that leaves
//! the controller: the light enumeration, signal identifiers, and the
//! immutable [`IntersectionSnapshot`] pushed to viewers once per second.
//! Types flow downstream to `TypeScript` via `ts-rs` for the dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- String-backed identifier newtypes
//! - [`enums`] -- Light state, approach position, and phase stage
//! - [`snapshot`] -- Per-signal state and the intersection snapshot

pub mod enums;
pub mod ids;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use enums::{LightState, PhaseStage, Position};
pub use ids::SignalId;
pub use snapshot::{IntersectionSnapshot, SignalState};
