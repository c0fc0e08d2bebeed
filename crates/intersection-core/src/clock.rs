//! The intersection clock: authoritative phase and countdown state.
//!
//! [`ClockState`] is the plain value that the transition rule operates
//! on. [`IntersectionClock`] wraps it in a single mutex together with a
//! shared [`TimingPlan`], so one scheduler can tick while any number of
//! readers take snapshots.
//!
//! # Design Principles
//!
//! - `tick` and `snapshot` derive while holding the lock. A reader never
//!   sees a new phase paired with the previous phase's countdown.
//! - All countdown arithmetic saturates. The validated plan guarantees
//!   every duration is at least 1, so the countdown is positive between
//!   ticks.
//! - The clock has no notion of wall time. Each `tick` is one logical
//!   second regardless of how late the scheduler calls it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use intersection_types::IntersectionSnapshot;
use tracing::debug;

use crate::plan::{PhaseIndex, TimingPlan};
use crate::snapshot;

/// Errors that can occur when restoring a clock to an explicit state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// The requested state does not fit the plan.
    #[error("invalid clock state: {reason}")]
    InvalidState {
        /// Explanation of what is wrong with the state.
        reason: String,
    },
}

/// Mutable countdown state of the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockState {
    /// The active phase.
    phase: PhaseIndex,

    /// Seconds left in the active phase; in `1..=duration` between ticks.
    seconds_remaining: u32,

    /// Seconds since the current cycle began at the first phase.
    cycle_elapsed_seconds: u32,

    /// Total ticks applied since construction.
    ticks: u64,
}

impl ClockState {
    /// The state every clock starts in: first phase, full duration, zero
    /// elapsed.
    pub fn initial(plan: &TimingPlan) -> Self {
        let phase = plan.first_phase();
        Self {
            phase,
            seconds_remaining: plan.duration_of(phase),
            cycle_elapsed_seconds: 0,
            ticks: 0,
        }
    }

    /// Restore a state part-way through a cycle.
    ///
    /// The cycle position is derived from the phase offset and the time
    /// already spent in the phase, so it always agrees with the plan.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidState`] if `phase` is out of range or
    /// `seconds_remaining` is not within `1..=duration` of that phase.
    pub fn from_parts(
        plan: &TimingPlan,
        phase: usize,
        seconds_remaining: u32,
    ) -> Result<Self, ClockError> {
        let phase_index = plan
            .phase_index(phase)
            .ok_or_else(|| ClockError::InvalidState {
                reason: format!(
                    "phase index {phase} out of range (plan has {} phases)",
                    plan.phase_count()
                ),
            })?;

        let duration = plan.duration_of(phase_index);
        if seconds_remaining == 0 || seconds_remaining > duration {
            return Err(ClockError::InvalidState {
                reason: format!(
                    "seconds_remaining {seconds_remaining} outside 1..={duration} for phase {}",
                    plan.phase(phase_index).id
                ),
            });
        }

        let spent = duration.saturating_sub(seconds_remaining);
        Ok(Self {
            phase: phase_index,
            seconds_remaining,
            cycle_elapsed_seconds: plan.offset_of(phase_index).saturating_add(spent),
            ticks: 0,
        })
    }

    /// Apply one second of logical time.
    ///
    /// Decrements the countdown. When it reaches zero the next phase
    /// starts with its full duration in the same tick. The cycle position
    /// advances by one, except on the tick that wraps back to the first
    /// phase, where it resets to zero.
    ///
    /// Returns `true` if a phase transition occurred.
    pub fn advance(&mut self, plan: &TimingPlan) -> bool {
        self.ticks = self.ticks.saturating_add(1);
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);

        if self.seconds_remaining > 0 {
            self.cycle_elapsed_seconds = self.cycle_elapsed_seconds.saturating_add(1);
            return false;
        }

        self.phase = plan.next_phase(self.phase);
        self.seconds_remaining = plan.duration_of(self.phase);
        if self.phase == plan.first_phase() {
            self.cycle_elapsed_seconds = 0;
        } else {
            self.cycle_elapsed_seconds = self.cycle_elapsed_seconds.saturating_add(1);
        }
        true
    }

    /// The active phase.
    pub const fn phase(&self) -> PhaseIndex {
        self.phase
    }

    /// Seconds left in the active phase.
    pub const fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    /// Seconds since the current cycle began.
    pub const fn cycle_elapsed_seconds(&self) -> u32 {
        self.cycle_elapsed_seconds
    }

    /// Total ticks applied.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Lock-guarded phase clock shared between the scheduler and readers.
///
/// Constructed once by the composition root and handed out behind an
/// [`Arc`]. `tick` must only be called from one driver; `snapshot` may be
/// called from anywhere at any time.
#[derive(Debug)]
pub struct IntersectionClock {
    plan: Arc<TimingPlan>,
    state: Mutex<ClockState>,
}

impl IntersectionClock {
    /// Create a clock in the initial state of `plan`.
    pub fn new(plan: Arc<TimingPlan>) -> Self {
        let state = ClockState::initial(&plan);
        Self {
            plan,
            state: Mutex::new(state),
        }
    }

    /// Create a clock positioned part-way through a cycle.
    ///
    /// # Errors
    ///
    /// See [`ClockState::from_parts`].
    pub fn starting_at(
        plan: Arc<TimingPlan>,
        phase: usize,
        seconds_remaining: u32,
    ) -> Result<Self, ClockError> {
        let state = ClockState::from_parts(&plan, phase, seconds_remaining)?;
        Ok(Self {
            plan,
            state: Mutex::new(state),
        })
    }

    /// The plan this clock runs.
    pub const fn plan(&self) -> &Arc<TimingPlan> {
        &self.plan
    }

    /// A copy of the current countdown state.
    pub fn state(&self) -> ClockState {
        *self.lock()
    }

    /// Advance one second and return the resulting snapshot.
    pub fn tick(&self) -> IntersectionSnapshot {
        let mut state = self.lock();
        if state.advance(&self.plan) {
            debug!(
                phase = %self.plan.phase(state.phase()).id,
                duration = state.seconds_remaining(),
                cycle_position = state.cycle_elapsed_seconds(),
                "Phase transition"
            );
        }
        snapshot::derive(&self.plan, &state, Utc::now())
    }

    /// Derive the current snapshot without changing state.
    pub fn snapshot(&self) -> IntersectionSnapshot {
        let state = self.lock();
        snapshot::derive(&self.plan, &state, Utc::now())
    }

    /// `advance` cannot panic part-way, so a poisoned lock still guards a
    /// consistent state.
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use intersection_types::{LightState, Position, SignalId};

    use super::*;
    use crate::plan::SignalSpec;

    fn four_signals() -> Vec<SignalSpec> {
        vec![
            SignalSpec::new("L1", "North Approach", Position::North),
            SignalSpec::new("L2", "East Approach", Position::East),
            SignalSpec::new("L3", "South Approach", Position::South),
            SignalSpec::new("L4", "West Approach", Position::West),
        ]
    }

    fn rotation() -> Arc<TimingPlan> {
        Arc::new(TimingPlan::rotation(four_signals(), 45, 0).unwrap())
    }

    fn pre_green() -> Arc<TimingPlan> {
        Arc::new(TimingPlan::pre_green(four_signals(), 45, 3, false).unwrap())
    }

    /// Reference model of the transition rule on raw integers.
    fn simulate(durations: &[u32], ticks: usize) -> (usize, u32) {
        let mut phase = 0usize;
        let mut remaining = durations[0];
        for _ in 0..ticks {
            remaining -= 1;
            if remaining == 0 {
                phase = (phase + 1) % durations.len();
                remaining = durations[phase];
            }
        }
        (phase, remaining)
    }

    #[test]
    fn clock_starts_at_first_phase() {
        let clock = IntersectionClock::new(rotation());
        let state = clock.state();
        assert_eq!(state.phase().get(), 0);
        assert_eq!(state.seconds_remaining(), 45);
        assert_eq!(state.cycle_elapsed_seconds(), 0);
        assert_eq!(state.ticks(), 0);
    }

    #[test]
    fn matches_reference_model() {
        let plan = Arc::new(
            TimingPlan::new(
                vec![
                    crate::plan::Phase::new("A", 3, intersection_types::PhaseStage::Green),
                    crate::plan::Phase::new("B", 1, intersection_types::PhaseStage::Green),
                    crate::plan::Phase::new("C", 5, intersection_types::PhaseStage::Green),
                ],
                vec![crate::plan::SignalBinding {
                    spec: SignalSpec::new("L1", "North", Position::North),
                    green_phase: 0,
                    pre_green_phase: None,
                }],
                crate::plan::LightPolicy::Plain,
            )
            .unwrap(),
        );
        let durations = [3, 1, 5];
        let mut state = ClockState::initial(&plan);
        for n in 1..=60 {
            state.advance(&plan);
            let (phase, remaining) = simulate(&durations, n);
            assert_eq!(state.phase().get(), phase, "phase after {n} ticks");
            assert_eq!(state.seconds_remaining(), remaining, "remaining after {n} ticks");
        }
    }

    #[test]
    fn countdown_stays_within_phase_bounds() {
        let plan = pre_green();
        let mut state = ClockState::initial(&plan);
        for _ in 0..500 {
            state.advance(&plan);
            assert!(state.seconds_remaining() > 0);
            assert!(state.seconds_remaining() <= plan.duration_of(state.phase()));
        }
    }

    #[test]
    fn cycle_position_resets_exactly_on_wrap() {
        let plan = pre_green();
        let cycle = plan.cycle_duration();
        let mut state = ClockState::initial(&plan);
        let mut previous = state.cycle_elapsed_seconds();
        for _ in 0..(cycle * 3) {
            let was_first = state.phase() == plan.first_phase();
            state.advance(&plan);
            let wrapped = !was_first && state.phase() == plan.first_phase();
            if wrapped {
                assert_eq!(state.cycle_elapsed_seconds(), 0);
            } else {
                assert_eq!(state.cycle_elapsed_seconds(), previous + 1);
            }
            // Position always agrees with where the phase sits in the cycle.
            let spent = plan.duration_of(state.phase()) - state.seconds_remaining();
            assert_eq!(
                state.cycle_elapsed_seconds(),
                plan.offset_of(state.phase()) + spent
            );
            previous = state.cycle_elapsed_seconds();
        }
    }

    #[test]
    fn rotation_transitions_after_full_green() {
        let clock = IntersectionClock::new(rotation());
        let snap = clock.snapshot();
        assert_eq!(snap.signal(&SignalId::new("L3")).unwrap().waiting_time_seconds, 90);

        for _ in 0..44 {
            clock.tick();
        }
        assert_eq!(clock.state().phase().get(), 0);
        assert_eq!(clock.state().seconds_remaining(), 1);

        let snap = clock.tick();
        assert_eq!(clock.state().phase().get(), 1);
        assert_eq!(clock.state().seconds_remaining(), 45);
        assert_eq!(snap.current_phase, "L2_Green");
        assert_eq!(snap.cycle_position_seconds, 45);
    }

    #[test]
    fn pre_green_scenario_counts_down_to_next_signal() {
        let clock = IntersectionClock::new(pre_green());
        let l2 = SignalId::new("L2");

        for _ in 0..3 {
            clock.tick();
        }
        let snap = clock.snapshot();
        assert_eq!(snap.current_phase, "L1_Green");
        assert_eq!(snap.phase_seconds_remaining, 45);
        assert_eq!(snap.signal(&l2).unwrap().waiting_time_seconds, 45);

        for expected in (1..45).rev() {
            let snap = clock.tick();
            assert_eq!(snap.current_phase, "L1_Green");
            assert_eq!(snap.signal(&l2).unwrap().waiting_time_seconds, expected);
        }

        let snap = clock.tick();
        assert_eq!(snap.current_phase, "L2_PreGreen");
        let l2_state = snap.signal(&l2).unwrap();
        assert_eq!(l2_state.waiting_time_seconds, 0);
        assert!(l2_state.is_pre_green);
        assert_eq!(l2_state.light_state, LightState::Yellow);
    }

    #[test]
    fn overlap_scenario_activates_next_signal_early() {
        let clock = IntersectionClock::new(Arc::new(
            TimingPlan::pre_green(four_signals(), 45, 3, true).unwrap(),
        ));
        let l1 = SignalId::new("L1");
        let l2 = SignalId::new("L2");

        for _ in 0..3 {
            clock.tick();
        }
        let snap = clock.snapshot();
        assert_eq!(snap.current_phase, "L1_Green");
        assert_eq!(snap.signal(&l2).unwrap().waiting_time_seconds, 45);

        let mut observed = Vec::new();
        for _ in 0..44 {
            let snap = clock.tick();
            assert_eq!(snap.current_phase, "L1_Green");
            assert_eq!(snap.signal(&l1).unwrap().light_state, LightState::Green);
            let l2_state = snap.signal(&l2).unwrap();
            assert_eq!(l2_state.is_pre_green, l2_state.light_state == LightState::Yellow);
            observed.push((
                snap.phase_seconds_remaining,
                l2_state.waiting_time_seconds,
                l2_state.light_state,
            ));
        }

        assert_eq!(observed[0], (44, 44, LightState::Red));
        assert_eq!(
            observed[39..],
            [
                (5, 5, LightState::Red),
                (4, 4, LightState::Red),
                (3, 0, LightState::Yellow),
                (2, 0, LightState::Yellow),
                (1, 0, LightState::Yellow),
            ]
        );

        let snap = clock.tick();
        assert_eq!(snap.current_phase, "L2_PreGreen");
        let l2_state = snap.signal(&l2).unwrap();
        assert_eq!(l2_state.waiting_time_seconds, 0);
        assert!(l2_state.is_pre_green);
        assert_eq!(l2_state.light_state, LightState::Yellow);
    }

    #[test]
    fn at_most_one_green_under_pre_green() {
        let clock = IntersectionClock::new(Arc::new(
            TimingPlan::pre_green(four_signals(), 10, 3, true).unwrap(),
        ));
        for _ in 0..200 {
            let snap = clock.tick();
            let greens = snap
                .signals
                .iter()
                .filter(|s| s.light_state == LightState::Green)
                .count();
            assert!(greens <= 1);
            for s in &snap.signals {
                if s.light_state.is_lit() {
                    assert_eq!(s.waiting_time_seconds, 0);
                } else {
                    assert!(s.waiting_time_seconds > 0);
                }
            }
        }
    }

    #[test]
    fn exactly_one_green_under_rotation() {
        let clock = IntersectionClock::new(rotation());
        for _ in 0..400 {
            let snap = clock.tick();
            let greens = snap
                .signals
                .iter()
                .filter(|s| s.light_state == LightState::Green)
                .count();
            assert_eq!(greens, 1);
        }
    }

    #[test]
    fn snapshot_is_idempotent_between_ticks() {
        let clock = IntersectionClock::new(pre_green());
        clock.tick();
        let a = clock.snapshot();
        let b = clock.snapshot();
        assert!(a.same_state(&b));
        assert_eq!(clock.state().ticks(), 1);
    }

    #[test]
    fn starting_at_restores_position() {
        let clock = IntersectionClock::starting_at(pre_green(), 3, 10).unwrap();
        let snap = clock.snapshot();
        assert_eq!(snap.current_phase, "L2_Green");
        // L1_PreGreen (3) + L1_Green (45) + L2_PreGreen (3) + 35 spent.
        assert_eq!(snap.cycle_position_seconds, 86);
    }

    #[test]
    fn starting_at_rejects_bad_state() {
        assert!(IntersectionClock::starting_at(pre_green(), 8, 1).is_err());
        assert!(IntersectionClock::starting_at(pre_green(), 0, 0).is_err());
        assert!(IntersectionClock::starting_at(pre_green(), 0, 4).is_err());
    }

    #[test]
    fn concurrent_readers_see_consistent_state() {
        let clock = Arc::new(IntersectionClock::new(Arc::new(
            TimingPlan::pre_green(four_signals(), 5, 2, true).unwrap(),
        )));

        std::thread::scope(|scope| {
            let ticker = Arc::clone(&clock);
            scope.spawn(move || {
                for _ in 0..2_000 {
                    ticker.tick();
                }
            });

            for _ in 0..4 {
                let reader = Arc::clone(&clock);
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        let snap = reader.snapshot();
                        let phase = reader
                            .plan()
                            .phases()
                            .iter()
                            .find(|p| p.id == snap.current_phase)
                            .unwrap();
                        assert_eq!(snap.total_phase_duration, phase.duration_seconds);
                        assert!(snap.phase_seconds_remaining >= 1);
                        assert!(snap.phase_seconds_remaining <= phase.duration_seconds);
                    }
                });
            }
        });

        assert_eq!(clock.state().ticks(), 2_000);
    }
}
