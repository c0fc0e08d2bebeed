//! Tick callback that pushes snapshots to the Observer API.

use std::sync::Arc;

use intersection_core::runner::TickCallback;
use intersection_observer::state::AppState;
use intersection_types::IntersectionSnapshot;
use tracing::{debug, info};

/// Callback that bridges the tick loop to connected viewers.
///
/// Broadcasts every snapshot and logs each phase change at `info` level.
pub struct BroadcastCallback {
    state: Arc<AppState>,
    last_phase: Option<String>,
}

impl BroadcastCallback {
    /// Create a callback backed by the given app state.
    pub const fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            last_phase: None,
        }
    }
}

impl TickCallback for BroadcastCallback {
    fn on_tick(&mut self, snapshot: &IntersectionSnapshot) {
        let receivers = self.state.broadcast(snapshot);
        debug!(
            phase = %snapshot.current_phase,
            remaining = snapshot.phase_seconds_remaining,
            receivers,
            "Snapshot broadcast sent"
        );

        if self.last_phase.as_deref() != Some(snapshot.current_phase.as_str()) {
            let active: Vec<&str> = snapshot
                .signals
                .iter()
                .filter(|s| s.is_active())
                .map(|s| s.id.as_str())
                .collect();
            info!(
                phase = %snapshot.current_phase,
                duration = snapshot.total_phase_duration,
                active = ?active,
                "Phase started"
            );
            self.last_phase = Some(snapshot.current_phase.clone());
        }
    }
}
