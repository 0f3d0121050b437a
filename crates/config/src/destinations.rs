//! Destination configuration types

use std::time::Duration;

use serde::Deserialize;

/// Container for all destination configurations
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DestinationsConfig {
    /// JSON-lines stdout destination
    pub stdout: Option<StdoutDestinationConfig>,

    /// MQTT publish destination
    pub mqtt: Option<MqttDestinationConfig>,
}

/// Stdout destination configuration
///
/// Batching knobs map straight onto the batching core.
///
/// # Example
///
/// ```toml
/// [destinations.stdout]
/// flush_length = 32
/// flush_frequency = "1s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StdoutDestinationConfig {
    /// Whether this destination is enabled
    /// Default: true (enabled when the section is present)
    pub enabled: bool,

    /// Maximum messages per flushed batch
    /// Default: 32
    pub flush_length: usize,

    /// Maximum buffering latency once a batch is non-empty
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub flush_frequency: Option<Duration>,

    /// Maximum flushes in flight at once
    /// Default: 1
    pub flush_parallelism: usize,

    /// Shutdown grace period before declaring deadlock
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub stop_timeout: Duration,
}

impl Default for StdoutDestinationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_length: 32,
            flush_frequency: Some(Duration::from_secs(1)),
            flush_parallelism: 1,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// MQTT destination configuration
///
/// # Example
///
/// ```toml
/// [destinations.mqtt]
/// broker = "mqtt://broker.local:1883"
/// client_id = "freightd-dst"
/// topic = "freight/events"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttDestinationConfig {
    /// Whether this destination is enabled
    /// Default: true (enabled when the section is present)
    pub enabled: bool,

    /// Broker address (required)
    pub broker: String,

    /// Client identifier (required)
    pub client_id: String,

    /// Topic to publish to (required)
    pub topic: String,

    /// Quality-of-service level (0, 1 or 2)
    /// Default: 1 (at-least-once)
    pub qos: u8,

    /// Publish with the retained flag
    /// Default: false
    pub retain: bool,

    /// Optional username
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,
}

impl Default for MqttDestinationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            broker: String::new(),
            client_id: String::new(),
            topic: String::new(),
            qos: 1,
            retain: false,
            username: None,
            password: None,
        }
    }
}
