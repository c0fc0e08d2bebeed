//! Phase/timing state machine for a fixed-cycle intersection controller.
//!
//! This crate owns the authoritative model of which lights are red,
//! yellow, or green at any instant. A [`TimingPlan`] describes the
//! circular phase sequence; an [`IntersectionClock`] advances it once per
//! second and derives immutable snapshots for broadcast.
//!
//! # Modules
//!
//! - [`plan`] -- Validated phase sequence, signal bindings, and the
//!   yellow-window policy.
//! - [`clock`] -- Mutable countdown state and the lock-guarded clock.
//! - [`snapshot`] -- Light derivation and waiting-time computation.
//! - [`config`] -- Configuration loading from `intersection-config.yaml`.
//! - [`runner`] -- Steady one-second driver with a [`TickCallback`] hook.
//!
//! [`TimingPlan`]: plan::TimingPlan
//! [`IntersectionClock`]: clock::IntersectionClock
//! [`TickCallback`]: runner::TickCallback

pub mod clock;
pub mod config;
pub mod plan;
pub mod runner;
pub mod snapshot;
