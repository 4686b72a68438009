//! TOML configuration: check cadence, targets, HTTP listener and logging.
//!
//! Everything is validated up front by [`PingboardConfig::load`]; a config
//! that fails validation never reaches the scheduler.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probes::{Target, TargetError};
use crate::scheduler::MonitorSettings;

/// Upper bound on the default probe timeout.
const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(5);

/// Shortest accepted check interval.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no targets configured")]
    NoTargets,

    #[error("interval_seconds must be at least 0.001, got {0}")]
    InvalidInterval(f64),

    #[error("history_capacity must be at least 1")]
    ZeroCapacity,

    #[error("history_capacity {capacity} exceeds the maximum of {max}")]
    CapacityTooLarge { capacity: usize, max: usize },

    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("timeout_ms ({timeout_ms}) exceeds the check interval ({interval_ms} ms)")]
    TimeoutExceedsInterval { timeout_ms: u64, interval_ms: u128 },

    #[error("target '{url}' is listed more than once")]
    DuplicateUrl { url: String },

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("invalid listen address '{address}': {reason}")]
    ListenAddress { address: String, reason: String },
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingboardConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl PingboardConfig {
    /// Read, parse and validate the TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings()?;
        self.probe_timeout()?;
        self.targets()?;
        self.listen_address()?;
        Ok(())
    }

    /// Validated targets in configuration order.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(self.targets.len());
        for entry in &self.targets {
            if !seen.insert(entry.url.as_str()) {
                return Err(ConfigError::DuplicateUrl {
                    url: entry.url.clone(),
                });
            }
            targets.push(Target::parse(&entry.url, entry.label.clone())?);
        }
        Ok(targets)
    }

    pub fn settings(&self) -> Result<MonitorSettings, ConfigError> {
        if self.monitor.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.monitor.history_capacity > MonitorSettings::MAX_HISTORY_CAPACITY {
            return Err(ConfigError::CapacityTooLarge {
                capacity: self.monitor.history_capacity,
                max: MonitorSettings::MAX_HISTORY_CAPACITY,
            });
        }
        Ok(MonitorSettings::new(
            self.monitor.interval()?,
            self.monitor.history_capacity,
        ))
    }

    /// Explicit `timeout_ms`, or half the interval capped at five seconds.
    pub fn probe_timeout(&self) -> Result<Duration, ConfigError> {
        let interval = self.monitor.interval()?;
        match self.monitor.timeout_ms {
            Some(0) => Err(ConfigError::ZeroTimeout),
            Some(ms) => {
                let timeout = Duration::from_millis(ms);
                if timeout > interval {
                    return Err(ConfigError::TimeoutExceedsInterval {
                        timeout_ms: ms,
                        interval_ms: interval.as_millis(),
                    });
                }
                Ok(timeout)
            }
            None => Ok((interval / 2).min(DEFAULT_MAX_TIMEOUT)),
        }
    }

    pub fn listen_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .listen_address
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::ListenAddress {
                address: self.server.listen_address.clone(),
                reason: e.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Check cadence and retention, shared by all targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between check starts. Fractions are allowed.
    pub interval_seconds: f64,
    /// Results kept per target.
    pub history_capacity: usize,
    /// Per-check timeout; must not exceed the interval.
    pub timeout_ms: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60.0,
            history_capacity: MonitorSettings::DEFAULT_HISTORY_CAPACITY,
            timeout_ms: None,
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        // Rejects negatives, NaN and values too large for a Duration.
        match Duration::try_from_secs_f64(self.interval_seconds) {
            Ok(d) if d >= MIN_INTERVAL => Ok(d),
            _ => Err(ConfigError::InvalidInterval(self.interval_seconds)),
        }
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for the status HTTP API.
    pub listen_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:8080".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
