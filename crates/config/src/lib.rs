//! Freight Configuration
//!
//! TOML-based configuration loading with sensible defaults. A minimal
//! config just works - only specify what you need to change.
//!
//! # Parsing
//!
//! ```
//! use freight_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[sources.journald]\n[destinations.stdout]\n",
//! ).unwrap();
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [sources.journald]
//!
//! [destinations.stdout]
//! flush_length = 32
//! flush_frequency = "1s"
//! ```
//!
//! See `configs/example.toml` for all available options.

mod destinations;
mod error;
mod logging;
mod sources;

pub use destinations::{DestinationsConfig, MqttDestinationConfig, StdoutDestinationConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use sources::{JournaldSourceConfig, MqttSourceConfig, SourcesConfig};

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults, but after
/// validation at least one source and one destination must be enabled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Daemon logging
    pub log: LogConfig,

    /// Input adapters
    pub sources: SourcesConfig,

    /// Output adapters
    pub destinations: DestinationsConfig,
}

impl Config {
    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        contents.parse()
    }

    /// Validate cross-field constraints
    ///
    /// Called by [`from_file`](Config::from_file) and [`FromStr`]; only
    /// needed directly for configs assembled in code.
    pub fn validate(&self) -> Result<()> {
        let journald_enabled = self
            .sources
            .journald
            .as_ref()
            .is_some_and(|journald| journald.enabled);
        let mqtt_src_enabled = self.sources.mqtt.as_ref().is_some_and(|mqtt| mqtt.enabled);
        if !journald_enabled && !mqtt_src_enabled {
            return Err(ConfigError::NoSourcesEnabled);
        }

        if let Some(mqtt) = self.sources.mqtt.as_ref().filter(|mqtt| mqtt.enabled) {
            if mqtt.broker.is_empty() {
                return Err(ConfigError::missing_field("source", "mqtt", "broker"));
            }
            if mqtt.client_id.is_empty() {
                return Err(ConfigError::missing_field("source", "mqtt", "client_id"));
            }
            if mqtt.qos > 2 {
                return Err(ConfigError::invalid_value(
                    "source",
                    "mqtt",
                    "qos",
                    "must be 0, 1 or 2",
                ));
            }
        }

        let stdout_enabled = self
            .destinations
            .stdout
            .as_ref()
            .is_some_and(|stdout| stdout.enabled);
        let mqtt_dst_enabled = self
            .destinations
            .mqtt
            .as_ref()
            .is_some_and(|mqtt| mqtt.enabled);
        if !stdout_enabled && !mqtt_dst_enabled {
            return Err(ConfigError::NoDestinationsEnabled);
        }

        if let Some(stdout) = self.destinations.stdout.as_ref().filter(|s| s.enabled) {
            if stdout.flush_length == 0 {
                return Err(ConfigError::invalid_value(
                    "destination",
                    "stdout",
                    "flush_length",
                    "must be at least 1",
                ));
            }
            if stdout.flush_parallelism == 0 {
                return Err(ConfigError::invalid_value(
                    "destination",
                    "stdout",
                    "flush_parallelism",
                    "must be at least 1",
                ));
            }
        }

        if let Some(mqtt) = self.destinations.mqtt.as_ref().filter(|mqtt| mqtt.enabled) {
            if mqtt.broker.is_empty() {
                return Err(ConfigError::missing_field("destination", "mqtt", "broker"));
            }
            if mqtt.client_id.is_empty() {
                return Err(ConfigError::missing_field(
                    "destination",
                    "mqtt",
                    "client_id",
                ));
            }
            if mqtt.topic.is_empty() {
                return Err(ConfigError::missing_field("destination", "mqtt", "topic"));
            }
            if mqtt.qos > 2 {
                return Err(ConfigError::invalid_value(
                    "destination",
                    "mqtt",
                    "qos",
                    "must be 0, 1 or 2",
                ));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
