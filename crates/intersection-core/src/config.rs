//! Configuration loading and typed config structures for the controller.
//!
//! The canonical configuration lives in `intersection-config.yaml` at the
//! project root. Every field has a default, so a partial (or empty) file
//! produces a working controller: four signals, 45 s greens, 3 s
//! dedicated pre-green phases.

use std::path::Path;

use intersection_types::Position;
use serde::Deserialize;
use tracing::warn;

use crate::plan::{PlanError, SignalSpec, TimingPlan};

/// Environment variable overriding [`ObserverConfig::port`].
pub const ENV_OBSERVER_PORT: &str = "INTERSECTION_OBSERVER_PORT";

/// Environment variable overriding [`ObserverConfig::host`].
pub const ENV_OBSERVER_HOST: &str = "INTERSECTION_OBSERVER_HOST";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
///
/// Mirrors the structure of `intersection-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IntersectionConfig {
    /// Timing plan: policy, durations, and signal list.
    #[serde(default)]
    pub intersection: PlanConfig,

    /// Scheduler settings.
    #[serde(default)]
    pub timing: TimingConfig,

    /// HTTP/WebSocket observer settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Run boundaries.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
}

impl IntersectionConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// [`ENV_OBSERVER_PORT`] and [`ENV_OBSERVER_HOST`] override the
    /// observer section when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }
}

/// Which preset the timing plan is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanPolicy {
    /// One green phase per signal, optional trailing yellow.
    Rotation,
    /// A dedicated pre-green phase before each green phase.
    #[default]
    PreGreen,
    /// Two-axis NS/EW scheme with shared phases.
    Axis,
}

/// Timing plan configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanConfig {
    /// Preset used to build the phase sequence.
    #[serde(default)]
    pub policy: PlanPolicy,

    /// Duration of every green phase, in seconds.
    #[serde(default = "default_green_seconds")]
    pub green_seconds: u32,

    /// Duration of every pre-green phase (and of the overlap window).
    #[serde(default = "default_pre_green_seconds")]
    pub pre_green_seconds: u32,

    /// Trailing yellow window for the `rotation` policy (0 = none).
    #[serde(default)]
    pub yellow_window_seconds: u32,

    /// Whether the next signal shows yellow at the end of each green
    /// phase under the `pre_green` policy.
    #[serde(default)]
    pub overlap: bool,

    /// Signals in service order. Ignored by the `axis` policy, which has
    /// a fixed N/S/E/W layout.
    #[serde(default = "default_signals")]
    pub signals: Vec<SignalSpec>,
}

impl PlanConfig {
    /// Build and validate the timing plan this section describes.
    ///
    /// # Errors
    ///
    /// Returns the [`PlanError`] of the first validation rule the
    /// configuration violates.
    pub fn build_plan(&self) -> Result<TimingPlan, PlanError> {
        match self.policy {
            PlanPolicy::Rotation => TimingPlan::rotation(
                self.signals.clone(),
                self.green_seconds,
                self.yellow_window_seconds,
            ),
            PlanPolicy::PreGreen => TimingPlan::pre_green(
                self.signals.clone(),
                self.green_seconds,
                self.pre_green_seconds,
                self.overlap,
            ),
            PlanPolicy::Axis => TimingPlan::axis(self.green_seconds, self.pre_green_seconds),
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            policy: PlanPolicy::default(),
            green_seconds: default_green_seconds(),
            pre_green_seconds: default_pre_green_seconds(),
            yellow_window_seconds: 0,
            overlap: false,
            signals: default_signals(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Real-time milliseconds per logical second.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Observer server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Listen port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl ObserverConfig {
    /// Override host and port with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. An unparseable port is
    /// logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_OBSERVER_HOST) {
            self.host = host;
        }
        if let Some(raw) = lookup(ENV_OBSERVER_PORT) {
            match raw.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid {ENV_OBSERVER_PORT}"),
            }
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Run boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many ticks (0 = run until shutdown).
    #[serde(default)]
    pub max_ticks: u64,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_green_seconds() -> u32 {
    45
}

const fn default_pre_green_seconds() -> u32 {
    3
}

fn default_signals() -> Vec<SignalSpec> {
    vec![
        SignalSpec::new("L1", "North Approach", Position::North),
        SignalSpec::new("L2", "East Approach", Position::East),
        SignalSpec::new("L3", "South Approach", Position::South),
        SignalSpec::new("L4", "West Approach", Position::West),
    ]
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
