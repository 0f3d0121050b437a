//! Freight MQTT - Pub/sub source and destination
//!
//! Both halves of an MQTT hookup over `rumqttc`:
//!
//! - [`MqttSource`] subscribes to a topic filter and turns every publish
//!   into a `(message, ack)` pair; the ack releases the broker message,
//!   so unacknowledged messages are redelivered after a reconnect.
//! - [`MqttDestination`] publishes messages to a configured topic, with
//!   per-message topic overrides.
//!
//! # Example
//!
//! ```ignore
//! use freight_mqtt::{MqttConfig, MqttSource};
//!
//! let config = MqttConfig::new("mqtt://broker.local:1883", "freightd-src")
//!     .with_topic("sensors/#");
//! let source = MqttSource::new(config)?;
//! ```

mod config;
mod destination;
mod error;
mod source;

pub use config::{qos_from_u8, MqttConfig};
pub use destination::MqttDestination;
pub use error::{MqttError, Result};
pub use source::MqttSource;

pub use rumqttc::QoS;

#[cfg(test)]
mod mqtt_test;
