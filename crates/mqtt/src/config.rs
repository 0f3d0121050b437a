//! MQTT adapter configuration

use std::time::Duration;

use rumqttc::{MqttOptions, QoS};

use crate::error::{MqttError, Result};

/// Configuration shared by the MQTT source and destination
///
/// # Example
///
/// ```
/// use freight_mqtt::MqttConfig;
///
/// let config = MqttConfig::new("mqtt://broker.local:1883", "freightd")
///     .with_topic("logs/#")
///     .with_qos(freight_mqtt::QoS::AtLeastOnce);
/// ```
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker address: `host`, `host:port`, or `mqtt://host:port`
    pub broker: String,

    /// Client identifier presented to the broker
    pub client_id: String,

    /// Topic filter to subscribe to, or topic to publish to.
    /// Default: `#` (match all)
    pub topic: String,

    /// Quality-of-service level. Default: at-least-once
    pub qos: QoS,

    /// Publish with the retained flag. Default: false
    pub retain: bool,

    /// Optional username
    pub username: Option<String>,

    /// Optional password
    pub password: Option<String>,

    /// Keep-alive interval. Default: 30s
    pub keep_alive: Duration,
}

impl MqttConfig {
    /// Create a config for `broker` with the given client id
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            topic: "#".into(),
            qos: QoS::AtLeastOnce,
            retain: false,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(30),
        }
    }

    /// Set the topic; an empty topic falls back to the match-all filter
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        let topic = topic.into();
        self.topic = if topic.is_empty() { "#".into() } else { topic };
        self
    }

    /// Set the quality-of-service level
    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Set the retained flag
    #[must_use]
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = retain;
        self
    }

    /// Set username and password
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the keep-alive interval
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.broker.is_empty() {
            return Err(MqttError::MissingBroker);
        }
        if self.client_id.is_empty() {
            return Err(MqttError::MissingClientId);
        }
        Ok(())
    }

    pub(crate) fn client_options(&self) -> Result<MqttOptions> {
        self.validate()?;
        let (host, port) = parse_broker(&self.broker)?;
        let mut options = MqttOptions::new(self.client_id.clone(), host, port);
        options.set_keep_alive(self.keep_alive);
        if let Some(username) = &self.username {
            options.set_credentials(username.clone(), self.password.clone().unwrap_or_default());
        }
        Ok(options)
    }
}

/// Map a numeric quality-of-service level to [`QoS`]
pub fn qos_from_u8(qos: u8) -> Result<QoS> {
    match qos {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(MqttError::InvalidQos(other)),
    }
}

/// Split a broker address into host and port, defaulting to 1883
pub(crate) fn parse_broker(broker: &str) -> Result<(String, u16)> {
    let stripped = broker
        .strip_prefix("mqtt://")
        .or_else(|| broker.strip_prefix("tcp://"))
        .unwrap_or(broker);

    let (host, port) = match stripped.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| MqttError::InvalidBroker(broker.to_string()))?;
            (host, port)
        }
        None => (stripped, 1883),
    };
    if host.is_empty() {
        return Err(MqttError::InvalidBroker(broker.to_string()));
    }
    Ok((host.to_string(), port))
}
