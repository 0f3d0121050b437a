//! MQTT adapter error types

use thiserror::Error;

/// Result type for MQTT operations
pub type Result<T> = std::result::Result<T, MqttError>;

/// Errors from the MQTT source and destination
#[derive(Debug, Error)]
pub enum MqttError {
    /// No broker address configured
    #[error("mqtt: missing broker")]
    MissingBroker,

    /// No client identifier configured
    #[error("mqtt: missing client id")]
    MissingClientId,

    /// The broker address could not be parsed
    #[error("mqtt: invalid broker address '{0}'")]
    InvalidBroker(String),

    /// Quality-of-service level outside 0..=2
    #[error("mqtt: invalid qos {0}, expected 0, 1 or 2")]
    InvalidQos(u8),

    /// The client rejected a request (publish, subscribe, ack)
    #[error("mqtt client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    /// The connection to the broker failed
    #[error("mqtt connection error: {0}")]
    Connection(#[from] rumqttc::ConnectionError),

    /// `run` was invoked a second time on the same instance
    #[error("run may only be invoked once per mqtt adapter")]
    AlreadyRunning,
}
