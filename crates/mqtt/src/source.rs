//! MQTT source

use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::{AsyncClient, Event as MqttEvent, Packet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use freight_protocol::{AckFn, BoxError, Cancelled, Message, MsgAck, Source};

use crate::config::MqttConfig;
use crate::error::{MqttError, Result};

/// Subscribes to a topic filter and yields `(message, ack)` pairs
///
/// The broker connection runs in manual-acknowledgment mode: a message is
/// released back to the broker only when its ack fires, so anything still
/// unacknowledged at disconnect is redelivered on the next session.
pub struct MqttSource {
    config: MqttConfig,
    tx: mpsc::Sender<MsgAck<Bytes>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<MsgAck<Bytes>>>,
}

impl MqttSource {
    /// Create a source; fails fast on an invalid config
    pub fn new(config: MqttConfig) -> Result<Self> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(1);
        Ok(Self {
            config,
            tx,
            rx: tokio::sync::Mutex::new(rx),
        })
    }

    async fn recv_loop(&self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        let mut options = self.config.client_options()?;
        options.set_manual_acks(true);
        let (client, mut eventloop) = AsyncClient::new(options, 16);

        client
            .subscribe(self.config.topic.as_str(), self.config.qos)
            .await
            .map_err(MqttError::Client)?;
        info!(topic = %self.config.topic, "subscribed");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = client.disconnect().await;
                    return Err(Cancelled.into());
                }
                polled = eventloop.poll() => polled,
            };

            let publish = match polled {
                Ok(MqttEvent::Incoming(Packet::Publish(publish))) => publish,
                Ok(_) => continue,
                Err(err) => {
                    error!(error = %err, "mqtt connection lost");
                    return Err(MqttError::Connection(err).into());
                }
            };

            let msg = Message::new(publish.payload.clone())
                .with_key(publish.pkid.to_string())
                .with_topic(publish.topic.clone());
            let ack: AckFn = {
                let client = client.clone();
                Box::new(move || {
                    if let Err(err) = client.try_ack(&publish) {
                        warn!(error = %err, "acknowledging mqtt message");
                    }
                })
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = client.disconnect().await;
                    return Err(Cancelled.into());
                }
                handed_off = self.tx.send(MsgAck::new(msg, Some(ack))) => {
                    if handed_off.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Source<Bytes> for MqttSource {
    async fn run(&self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        self.recv_loop(cancel).await
    }

    async fn recv(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<MsgAck<Bytes>, BoxError> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Err(Cancelled.into()),
            received = rx.recv() => received.ok_or_else(|| Cancelled.into()),
        }
    }
}
