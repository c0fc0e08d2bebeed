//! Shared application state for the Observer API server.
//!
//! [`AppState`] pairs the shared [`IntersectionClock`] with the broadcast
//! channel that fans each tick's snapshot out to connected viewers.

use std::sync::Arc;

use intersection_core::clock::IntersectionClock;
use intersection_types::IntersectionSnapshot;
use tokio::sync::broadcast;

/// Capacity of the broadcast channel for snapshots.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message. Snapshots are self-contained, so nothing is lost by
/// skipping.
const BROADCAST_CAPACITY: usize = 64;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The authoritative clock. Read-only from the observer's side.
    pub clock: Arc<IntersectionClock>,
    /// Broadcast sender for per-tick snapshots.
    pub tx: broadcast::Sender<IntersectionSnapshot>,
}

impl AppState {
    /// Create application state around a shared clock.
    pub fn new(clock: Arc<IntersectionClock>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { clock, tx }
    }

    /// Subscribe to the snapshot broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<IntersectionSnapshot> {
        self.tx.subscribe()
    }

    /// Publish a snapshot to all connected clients.
    ///
    /// Returns the number of receivers that received the message.
    /// Returns 0 if no clients are connected (this is not an error).
    pub fn broadcast(&self, snapshot: &IntersectionSnapshot) -> usize {
        self.tx.send(snapshot.clone()).unwrap_or(0)
    }

    /// The current snapshot, derived on demand from the clock.
    pub fn current(&self) -> IntersectionSnapshot {
        self.clock.snapshot()
    }

    /// Subscribe and take the current snapshot, in that order.
    ///
    /// A tick landing between the two steps shows up both in the returned
    /// snapshot and on the receiver. The reverse order could lose it.
    pub fn attach(&self) -> (broadcast::Receiver<IntersectionSnapshot>, IntersectionSnapshot) {
        let rx = self.subscribe();
        (rx, self.current())
    }
}
