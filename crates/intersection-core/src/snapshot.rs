//! Snapshot derivation: per-signal lights, countdowns, and waiting times.
//!
//! Everything here is a pure function of the plan and a [`ClockState`].
//! The clock calls [`derive`] while holding its lock so a snapshot never
//! mixes values from two different ticks.

use chrono::{DateTime, Utc};
use intersection_types::{IntersectionSnapshot, SignalState};

use crate::clock::ClockState;
use crate::plan::{PhaseIndex, SignalPlan, TimingPlan};

/// Derive the externally visible state of the intersection.
pub fn derive(
    plan: &TimingPlan,
    state: &ClockState,
    generated_at: DateTime<Utc>,
) -> IntersectionSnapshot {
    let current = plan.phase(state.phase());
    let signals = plan
        .signals()
        .iter()
        .map(|signal| signal_state(plan, state, signal))
        .collect();

    IntersectionSnapshot {
        current_phase: current.id.clone(),
        phase_seconds_remaining: state.seconds_remaining(),
        total_phase_duration: current.duration_seconds,
        cycle_position_seconds: state.cycle_elapsed_seconds(),
        generated_at,
        signals,
    }
}

fn signal_state(plan: &TimingPlan, state: &ClockState, signal: &SignalPlan) -> SignalState {
    let light = plan.light_at(signal, state.phase(), state.seconds_remaining());

    // Waiting time is only defined for inactive signals.
    let (waiting_time_seconds, phase_seconds_remaining) = if light.is_active() {
        (0, state.seconds_remaining())
    } else {
        (waiting_time(plan, state, signal.target_phase()), 0)
    };

    SignalState {
        id: signal.spec.id.clone(),
        lane_name: signal.spec.lane_name.clone(),
        position: signal.spec.position,
        light_state: light.light,
        is_pre_green: light.is_pre_green,
        waiting_time_seconds,
        phase_seconds_remaining,
    }
}

/// Seconds until `target` next begins.
///
/// The remainder of the current phase plus the full duration of every
/// phase strictly between the current phase and `target`, walking forward
/// and wrapping past the end of the sequence. The walk covers at most one
/// lap, so an index taken from another plan yields a bounded total instead
/// of spinning.
pub fn waiting_time(plan: &TimingPlan, state: &ClockState, target: PhaseIndex) -> u32 {
    let mut total = state.seconds_remaining();
    let mut phase = plan.next_phase(state.phase());
    for _ in 1..plan.phase_count() {
        if phase == target {
            break;
        }
        total = total.saturating_add(plan.duration_of(phase));
        phase = plan.next_phase(phase);
    }
    total
}
