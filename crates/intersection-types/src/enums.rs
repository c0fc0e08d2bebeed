//! Enumeration types shared between the controller and its viewers.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Light state
// ---------------------------------------------------------------------------

/// The aspect a signal head is showing.
///
/// Never stored by the controller: always derived from the current phase,
/// the signal-to-phase mapping, and the seconds remaining in the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LightState {
    /// Stop.
    Red,
    /// Advance warning or clearance.
    Yellow,
    /// Proceed.
    Green,
}

impl LightState {
    /// Whether the signal is doing anything other than holding traffic.
    pub const fn is_lit(self) -> bool {
        match self {
            Self::Red => false,
            Self::Yellow | Self::Green => true,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Red => "Red",
            Self::Yellow => "Yellow",
            Self::Green => "Green",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Approach position
// ---------------------------------------------------------------------------

/// Compass approach a signal controls. Used by viewers for layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Position {
    /// Northern approach.
    North,
    /// Eastern approach.
    East,
    /// Southern approach.
    South,
    /// Western approach.
    West,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::North => "North",
            Self::East => "East",
            Self::South => "South",
            Self::West => "West",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Phase stage
// ---------------------------------------------------------------------------

/// What a phase does for the signals bound to it.
///
/// Closed on purpose: every derivation site matches exhaustively, so a
/// new stage cannot silently fall through to red.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum PhaseStage {
    /// Short advance-warning interval before the bound signals turn green.
    PreGreen,
    /// The bound signals show green.
    Green,
}
