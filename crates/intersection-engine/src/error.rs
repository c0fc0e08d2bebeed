//! Error types for the controller binary.
//!
//! [`EngineError`] is the top-level error type that wraps every failure
//! mode during startup. Once the tick loop is running nothing can fail.

/// Top-level error for the controller binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: intersection_core::config::ConfigError,
    },

    /// The configured timing plan is invalid.
    #[error("timing plan error: {source}")]
    Plan {
        /// The underlying validation error.
        #[from]
        source: intersection_core::plan::PlanError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: intersection_observer::StartupError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
