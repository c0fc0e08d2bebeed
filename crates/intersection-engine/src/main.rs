//! Controller binary for the intersection.
//!
//! This is the composition root: it builds the one shared clock and
//! hands it to the tick loop and the observer explicitly. No component
//! reaches for global state.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `intersection-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (`RUST_LOG`, else `logging.level`)
//! 3. Build and validate the timing plan
//! 4. Create the intersection clock
//! 5. Start the Observer API server
//! 6. Run the tick loop until Ctrl-C or `simulation.max_ticks`
//! 7. Log the result and stop the server

mod error;
mod observer_callback;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use intersection_core::clock::IntersectionClock;
use intersection_core::config::IntersectionConfig;
use intersection_core::runner;
use intersection_observer::server::ServerConfig;
use intersection_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::BroadcastCallback;

/// Default configuration file, relative to the working directory.
const CONFIG_PATH: &str = "intersection-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, plan validation, or observer
/// startup fails. The tick loop itself cannot fail.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so report the source
    //    after the subscriber is installed.
    let (config, loaded_from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging.level)?;
    info!(
        source = if loaded_from_file { CONFIG_PATH } else { "defaults" },
        policy = ?config.intersection.policy,
        tick_interval_ms = config.timing.tick_interval_ms,
        max_ticks = config.simulation.max_ticks,
        "Configuration loaded"
    );

    // 3. Build the timing plan. An invalid plan is fatal.
    let plan = Arc::new(config.intersection.build_plan()?);
    info!(
        phases = plan.phase_count(),
        signals = plan.signals().len(),
        cycle_seconds = plan.cycle_duration(),
        policy = ?plan.policy(),
        "Timing plan validated"
    );

    // 4. Create the clock.
    let clock = Arc::new(IntersectionClock::new(plan));

    // 5. Start the Observer API server.
    let app_state = Arc::new(AppState::new(Arc::clone(&clock)));
    let server_config = ServerConfig::from(&config.observer);
    let observer = intersection_observer::spawn_observer(&server_config, Arc::clone(&app_state))
        .await?;
    info!(addr = %observer.addr, "Observer API server started");

    // 6. Run the tick loop.
    let mut callback = BroadcastCallback::new(app_state);
    let summary = runner::run_clock(
        &clock,
        Duration::from_millis(config.timing.tick_interval_ms),
        config.simulation.max_ticks,
        &mut callback,
        shutdown_signal(),
    )
    .await;

    // 7. Log results and stop serving.
    runner::log_run_end(&summary);
    observer.task.abort();

    info!(
        end_reason = ?summary.end_reason,
        total_ticks = summary.total_ticks,
        "intersection-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from [`CONFIG_PATH`] if it exists, else defaults.
///
/// Returns the config and whether it came from the file.
fn load_config() -> Result<(IntersectionConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((IntersectionConfig::from_file(config_path)?, true))
    } else {
        let mut config = IntersectionConfig::default();
        config.observer.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the fmt subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_logging(level: &str) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level {level:?}: {e}"),
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| EngineError::Logging {
            message: format!("{e}"),
        })
}

/// Resolves on Ctrl-C. If the handler cannot be installed the loop runs
/// until its tick limit instead of stopping immediately.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}
