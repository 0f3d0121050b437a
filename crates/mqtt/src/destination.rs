//! MQTT destination

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rumqttc::{AsyncClient, EventLoop};
use tokio_util::sync::CancellationToken;
use tracing::error;

use freight_protocol::{AckFn, BoxError, Cancelled, Destination, Message};

use crate::config::MqttConfig;
use crate::error::{MqttError, Result};

/// Publishes messages to an MQTT broker
///
/// `send` queues each message on the client and invokes the ack once all
/// of them are accepted; the connection's event loop, driven by `run`,
/// carries them to the broker. A message's own topic overrides the
/// configured publish topic.
pub struct MqttDestination {
    config: MqttConfig,
    client: AsyncClient,
    // Taken exactly once by run()
    eventloop: Mutex<Option<EventLoop>>,
}

impl MqttDestination {
    /// Create a destination; fails fast on an invalid config
    pub fn new(config: MqttConfig) -> Result<Self> {
        let options = config.client_options()?;
        let (client, eventloop) = AsyncClient::new(options, 16);
        Ok(Self {
            config,
            client,
            eventloop: Mutex::new(Some(eventloop)),
        })
    }
}

#[async_trait]
impl Destination<Bytes> for MqttDestination {
    async fn run(&self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        let mut eventloop = self
            .eventloop
            .lock()
            .take()
            .ok_or(MqttError::AlreadyRunning)?;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = self.client.disconnect().await;
                    return Err(Cancelled.into());
                }
                polled = eventloop.poll() => {
                    if let Err(err) = polled {
                        error!(error = %err, "mqtt connection lost");
                        return Err(MqttError::Connection(err).into());
                    }
                }
            }
        }
    }

    async fn send(
        &self,
        _cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<Bytes>>,
    ) -> std::result::Result<(), BoxError> {
        for msg in msgs {
            let topic = msg.topic.as_deref().unwrap_or(&self.config.topic);
            self.client
                .publish(topic, self.config.qos, self.config.retain, msg.value.to_vec())
                .await
                .map_err(MqttError::Client)?;
        }
        if let Some(ack) = ack {
            ack();
        }
        Ok(())
    }
}
