//! Tick driver for the intersection clock.
//!
//! [`run_clock`] advances an [`IntersectionClock`] once per interval on a
//! monotonic tokio timer until a tick limit is reached or a shutdown
//! future resolves. Each resulting snapshot is handed to a
//! [`TickCallback`], which is how the observer learns about new states.
//!
//! A late timer is not caught up: with [`MissedTickBehavior::Delay`] a
//! stalled runtime produces one tick when it resumes, then the schedule
//! continues from there.

use std::future::Future;
use std::time::Duration;

use intersection_types::IntersectionSnapshot;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::clock::IntersectionClock;

/// Why [`run_clock`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The configured tick limit was reached.
    MaxTicksReached,
    /// The shutdown future resolved.
    Shutdown,
}

/// Result of a clock run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// The reason the run ended.
    pub end_reason: RunEndReason,
    /// Number of ticks applied during this run.
    pub total_ticks: u64,
    /// Snapshot of the clock after the last tick (or at shutdown).
    pub final_snapshot: IntersectionSnapshot,
}

/// Callback invoked after each tick.
///
/// Implementations cannot fail the loop. Anything that can go wrong
/// downstream (no subscribers, a slow client) must be handled inside
/// `on_tick`.
pub trait TickCallback: Send {
    /// Called with the snapshot produced by the tick.
    fn on_tick(&mut self, snapshot: &IntersectionSnapshot);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _snapshot: &IntersectionSnapshot) {}
}

/// Drive `clock` until `max_ticks` ticks have run or `shutdown` resolves.
///
/// The first tick happens one `interval` after the call, not immediately:
/// the clock's initial state is already a valid snapshot. A `max_ticks`
/// of 0 means unlimited. A zero `interval` is treated as one millisecond.
///
/// Shutdown is checked before every tick, so a run whose shutdown future
/// is already complete applies no ticks at all.
pub async fn run_clock<F>(
    clock: &IntersectionClock,
    interval: Duration,
    max_ticks: u64,
    callback: &mut dyn TickCallback,
    shutdown: F,
) -> RunSummary
where
    F: Future<Output = ()>,
{
    let period = interval.max(Duration::from_millis(1));
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately.
    timer.tick().await;

    tokio::pin!(shutdown);
    let mut total_ticks: u64 = 0;

    info!(
        interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        max_ticks,
        phase = %clock.snapshot().current_phase,
        "Clock runner starting"
    );

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!(total_ticks, "Shutdown requested");
                return RunSummary {
                    end_reason: RunEndReason::Shutdown,
                    total_ticks,
                    final_snapshot: clock.snapshot(),
                };
            }
            _ = timer.tick() => {}
        }

        let snapshot = clock.tick();
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&snapshot);

        if max_ticks > 0 && total_ticks >= max_ticks {
            info!(total_ticks, max_ticks, "Tick limit reached");
            return RunSummary {
                end_reason: RunEndReason::MaxTicksReached,
                total_ticks,
                final_snapshot: snapshot,
            };
        }
    }
}

/// Log the end of a clock run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        phase = %summary.final_snapshot.current_phase,
        phase_seconds_remaining = summary.final_snapshot.phase_seconds_remaining,
        cycle_position = summary.final_snapshot.cycle_position_seconds,
        "Clock runner stopped"
    );

    if summary.total_ticks == 0 {
        warn!("Clock runner stopped before the first tick");
    }
}
