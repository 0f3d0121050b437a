//! Daemon assembly and supervision
//!
//! Builds the configured sources and destinations into one pipeline and
//! runs it until a shutdown signal or a fatal leg failure.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use freight_batch::BatchConfig;
use freight_config::Config;
use freight_mqtt::{qos_from_u8, MqttConfig, MqttDestination, MqttSource};
use freight_pipeline::Pipeline;
use freight_protocol::Event;
use freight_sinks::StdoutDestination;
use freight_sources::journald::{JournaldConfig, JournaldSource};

use crate::adapters::{MqttEventDestination, MqttEventSource};

/// Run the daemon until ctrl-c or a fatal pipeline failure
pub async fn run(config: Config) -> Result<()> {
    let cancel = CancellationToken::new();

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    let pipeline = build_pipeline(&config)?;

    info!("freightd started");
    let result = pipeline.run(cancel).await;
    match &result {
        Ok(()) => info!("freightd stopped cleanly"),
        Err(err) => error!(error = %err, "freightd terminated on pipeline failure"),
    }
    result.map_err(Into::into)
}

/// Wire every enabled source and destination into one pipeline
fn build_pipeline(config: &Config) -> Result<Pipeline<Event>> {
    let mut builder = Pipeline::builder();

    if let Some(journald) = config
        .sources
        .journald
        .as_ref()
        .filter(|journald| journald.enabled)
    {
        let source = JournaldSource::new(
            JournaldConfig::new().with_cursor_path(&journald.cursor_path),
        );
        builder = builder.source("journald", Arc::new(source));
    }

    if let Some(mqtt) = config.sources.mqtt.as_ref().filter(|mqtt| mqtt.enabled) {
        let mut mqtt_config = MqttConfig::new(mqtt.broker.clone(), mqtt.client_id.clone())
            .with_topic(mqtt.topic.clone())
            .with_qos(qos_from_u8(mqtt.qos)?);
        if let Some(username) = &mqtt.username {
            mqtt_config = mqtt_config
                .with_credentials(username.clone(), mqtt.password.clone().unwrap_or_default());
        }
        let source = MqttEventSource::new(MqttSource::new(mqtt_config)?);
        builder = builder.source("mqtt", Arc::new(source));
    }

    if let Some(stdout) = config
        .destinations
        .stdout
        .as_ref()
        .filter(|stdout| stdout.enabled)
    {
        let batch = BatchConfig::new()
            .with_flush_length(stdout.flush_length)
            .with_flush_frequency(stdout.flush_frequency)
            .with_flush_parallelism(stdout.flush_parallelism)
            .with_stop_timeout(stdout.stop_timeout);
        builder = builder.destination("stdout", Arc::new(StdoutDestination::new(batch)?));
    }

    if let Some(mqtt) = config
        .destinations
        .mqtt
        .as_ref()
        .filter(|mqtt| mqtt.enabled)
    {
        let mut mqtt_config = MqttConfig::new(mqtt.broker.clone(), mqtt.client_id.clone())
            .with_topic(mqtt.topic.clone())
            .with_qos(qos_from_u8(mqtt.qos)?)
            .with_retain(mqtt.retain);
        if let Some(username) = &mqtt.username {
            mqtt_config = mqtt_config
                .with_credentials(username.clone(), mqtt.password.clone().unwrap_or_default());
        }
        let destination = MqttEventDestination::new(MqttDestination::new(mqtt_config)?);
        builder = builder.destination("mqtt", Arc::new(destination));
    }

    Ok(builder.build()?)
}
