use std::time::Duration;

use rumqttc::QoS;

use super::config::{parse_broker, qos_from_u8, MqttConfig};
use super::error::MqttError;

// =============================================================================
// Config defaults and builders
// =============================================================================

#[test]
fn test_defaults() {
    let config = MqttConfig::new("mqtt://broker.local:1883", "freightd");
    assert_eq!(config.topic, "#");
    assert_eq!(config.qos, QoS::AtLeastOnce);
    assert!(!config.retain);
    assert!(config.username.is_none());
    assert!(config.password.is_none());
    assert_eq!(config.keep_alive, Duration::from_secs(30));
}

#[test]
fn test_empty_topic_falls_back_to_match_all() {
    let config = MqttConfig::new("broker", "id").with_topic("");
    assert_eq!(config.topic, "#");

    let config = MqttConfig::new("broker", "id").with_topic("logs/#");
    assert_eq!(config.topic, "logs/#");
}

#[test]
fn test_builders() {
    let config = MqttConfig::new("broker", "id")
        .with_qos(QoS::ExactlyOnce)
        .with_retain(true)
        .with_credentials("user", "secret")
        .with_keep_alive(Duration::from_secs(5));
    assert_eq!(config.qos, QoS::ExactlyOnce);
    assert!(config.retain);
    assert_eq!(config.username.as_deref(), Some("user"));
    assert_eq!(config.password.as_deref(), Some("secret"));
    assert_eq!(config.keep_alive, Duration::from_secs(5));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_missing_broker_rejected() {
    let err = MqttConfig::new("", "id").validate().unwrap_err();
    assert!(matches!(err, MqttError::MissingBroker));
}

#[test]
fn test_missing_client_id_rejected() {
    let err = MqttConfig::new("broker", "").validate().unwrap_err();
    assert!(matches!(err, MqttError::MissingClientId));
}

// =============================================================================
// Broker address parsing
// =============================================================================

#[test]
fn test_parse_broker_variants() {
    assert_eq!(
        parse_broker("mqtt://broker.local:1883").unwrap(),
        ("broker.local".to_string(), 1883)
    );
    assert_eq!(
        parse_broker("tcp://broker.local:8883").unwrap(),
        ("broker.local".to_string(), 8883)
    );
    assert_eq!(
        parse_broker("broker.local:1884").unwrap(),
        ("broker.local".to_string(), 1884)
    );
    // No port falls back to the MQTT default.
    assert_eq!(
        parse_broker("broker.local").unwrap(),
        ("broker.local".to_string(), 1883)
    );
}

#[test]
fn test_parse_broker_rejects_garbage() {
    assert!(matches!(
        parse_broker("broker.local:notaport"),
        Err(MqttError::InvalidBroker(_))
    ));
    assert!(matches!(
        parse_broker("mqtt://:1883"),
        Err(MqttError::InvalidBroker(_))
    ));
}

// =============================================================================
// QoS mapping
// =============================================================================

#[test]
fn test_qos_from_u8() {
    assert_eq!(qos_from_u8(0).unwrap(), QoS::AtMostOnce);
    assert_eq!(qos_from_u8(1).unwrap(), QoS::AtLeastOnce);
    assert_eq!(qos_from_u8(2).unwrap(), QoS::ExactlyOnce);
    assert!(matches!(qos_from_u8(3), Err(MqttError::InvalidQos(3))));
}
