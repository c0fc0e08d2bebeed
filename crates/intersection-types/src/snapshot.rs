//! The push-update value handed to viewers.
//!
//! An [`IntersectionSnapshot`] is produced fresh on every tick and on
//! every on-demand read. It is never mutated after construction, so it
//! can be cloned into any number of broadcast receivers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{LightState, Position};
use crate::ids::SignalId;

/// Derived state of one signal at the snapshot instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SignalState {
    /// Stable signal identifier.
    pub id: SignalId,
    /// Human-readable lane or direction label.
    pub lane_name: String,
    /// Compass approach, for viewer layout.
    pub position: Position,
    /// The aspect currently shown.
    pub light_state: LightState,
    /// True while the signal is in its advance-warning interval.
    pub is_pre_green: bool,
    /// Seconds until this signal next becomes active; 0 while active.
    pub waiting_time_seconds: u32,
    /// Seconds left in the current phase while active; 0 otherwise.
    pub phase_seconds_remaining: u32,
}

impl SignalState {
    /// Whether the signal is green or in an advance-warning/clearance window.
    pub const fn is_active(&self) -> bool {
        self.light_state.is_lit()
    }
}

/// Fully derived description of the intersection at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct IntersectionSnapshot {
    /// Identifier of the active phase (e.g. `L1_Green`).
    pub current_phase: String,
    /// Seconds left in the active phase.
    pub phase_seconds_remaining: u32,
    /// Full configured duration of the active phase.
    pub total_phase_duration: u32,
    /// Seconds elapsed since the current cycle started at phase index 0.
    pub cycle_position_seconds: u32,
    /// When this snapshot was derived (UTC, RFC 3339 on the wire).
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
    /// One entry per configured signal, in plan order.
    pub signals: Vec<SignalState>,
}

impl IntersectionSnapshot {
    /// Look up one signal's state by identifier.
    pub fn signal(&self, id: &SignalId) -> Option<&SignalState> {
        self.signals.iter().find(|s| &s.id == id)
    }

    /// Compare everything except the generation timestamp.
    pub fn same_state(&self, other: &Self) -> bool {
        self.current_phase == other.current_phase
            && self.phase_seconds_remaining == other.phase_seconds_remaining
            && self.total_phase_duration == other.total_phase_duration
            && self.cycle_position_seconds == other.cycle_position_seconds
            && self.signals == other.signals
    }
}
