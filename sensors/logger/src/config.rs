/// Configuration management for the roadpulse logger
/// Layered: defaults, then config.toml, then environment, then CLI flags
use std::path::Path;

use roadpulse::{ConditionerKind, DetectorConfig};
use serde::{Deserialize, Serialize};

/// Relay connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Relay address (`host:port`); `None` keeps the session offline
    pub server: Option<String>,
    /// Local bind address for the UDP socket
    pub bind: String,
    /// Also broadcast our own position fixes
    pub publish_positions: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: None,
            bind: "0.0.0.0:0".to_string(),
            publish_positions: true,
        }
    }
}

/// Periodic diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Report interval in recording time (ms), 0 disables
    pub interval_ms: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { interval_ms: 10_000 }
    }
}

/// Master system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub detector: DetectorConfig,
    pub relay: RelayConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl SystemConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Apply overrides from the process environment
    ///
    /// ```bash
    /// export ROADPULSE_DEVICE_ID="van-7"
    /// export ROADPULSE_RELAY="192.168.1.100:9000"
    /// export ROADPULSE_CONDITIONER="enhanced"
    /// ```
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(device_id) = lookup("ROADPULSE_DEVICE_ID") {
            self.detector.device_id = device_id;
        }
        if let Some(server) = lookup("ROADPULSE_RELAY") {
            self.relay.server = if server.is_empty() { None } else { Some(server) };
        }
        if let Some(kind) = lookup("ROADPULSE_CONDITIONER") {
            self.detector.conditioner = kind
                .parse::<ConditionerKind>()
                .map_err(|_| ConfigError::InvalidValue("ROADPULSE_CONDITIONER"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let detector = &self.detector;
        if detector.device_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("detector.device_id"));
        }
        if detector.path_capacity == 0 {
            return Err(ConfigError::InvalidValue("detector.path_capacity"));
        }
        if detector.display_capacity == 0 {
            return Err(ConfigError::InvalidValue("detector.display_capacity"));
        }
        if !(detector.strong_score >= 0.0) {
            return Err(ConfigError::InvalidValue("detector.strong_score"));
        }
        if !(detector.segment_backtrack_m > 0.0) {
            return Err(ConfigError::InvalidValue("detector.segment_backtrack_m"));
        }
        if let Some(min_speed) = detector.min_speed_kmh {
            if !(min_speed >= 0.0) {
                return Err(ConfigError::InvalidValue("detector.min_speed_kmh"));
            }
        }
        if let Some(server) = &self.relay.server {
            if !server.contains(':') {
                return Err(ConfigError::InvalidValue("relay.server"));
            }
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
}
