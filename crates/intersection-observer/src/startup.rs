//! Observer server startup helper for embedding in the engine.
//!
//! [`spawn_observer`] binds the listen address on the caller's task, so a
//! port conflict is reported before the tick loop starts, then serves on
//! a background Tokio task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running observer: the address it actually bound and its task.
#[derive(Debug)]
pub struct ObserverHandle {
    /// Bound address (resolves port 0 to the assigned port).
    pub addr: SocketAddr,
    /// The serving task. Abort it to stop the server.
    pub task: JoinHandle<()>,
}

/// Bind the configured address and serve the Observer API in the
/// background.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is malformed or
/// cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, StartupError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            error!(error = %e, "Observer server exited with error");
        }
    });

    info!(%addr, "Observer server spawned on background task");

    Ok(ObserverHandle { addr, task })
}
