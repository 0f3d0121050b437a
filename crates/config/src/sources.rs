//! Source configuration types

use std::path::PathBuf;

use serde::Deserialize;

/// Container for all source configurations
///
/// A source is active when its section is present and `enabled` is not
/// set to false.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Journald tail source
    pub journald: Option<JournaldSourceConfig>,

    /// MQTT subscription source
    pub mqtt: Option<MqttSourceConfig>,
}

/// Journald source configuration
///
/// # Example
///
/// ```toml
/// [sources.journald]
/// cursor_path = "/var/lib/freightd/journald-hwm"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JournaldSourceConfig {
    /// Whether this source is enabled
    /// Default: true (enabled when the section is present)
    pub enabled: bool,

    /// Where the resume cursor is persisted
    /// Default: /tmp/freightd-journald-hwm
    pub cursor_path: PathBuf,
}

impl Default for JournaldSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cursor_path: PathBuf::from("/tmp/freightd-journald-hwm"),
        }
    }
}

/// MQTT source configuration
///
/// # Example
///
/// ```toml
/// [sources.mqtt]
/// broker = "mqtt://broker.local:1883"
/// client_id = "freightd-src"
/// topic = "sensors/#"
/// qos = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttSourceConfig {
    /// Whether this source is enabled
    /// Default: true (enabled when the section is present)
    pub enabled: bool,

    /// Broker address (required)
    pub broker: String,

    /// Client identifier (required)
    pub client_id: String,

    /// Topic filter to subscribe to
    /// Default: "#" (match all)
    pub topic: String,

    /// Quality-of-service level (0, 1 or 2)
    /// Default: 1 (at-least-once)
    pub qos: u8,

    /// Optional username
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,
}

impl Default for MqttSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broker: String::new(),
            client_id: String::new(),
            topic: "#".into(),
            qos: 1,
            username: None,
            password: None,
        }
    }
}
