//! Raw-payload adapters
//!
//! The MQTT adapters speak raw bytes; the pipeline speaks [`Event`].
//! These wrappers translate at the boundary so one pipeline type covers
//! every configured source and destination.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use freight_mqtt::{MqttDestination, MqttSource};
use freight_protocol::{AckFn, BoxError, Destination, Event, Message, MsgAck, Source};

/// Wrap a raw MQTT payload as a normalized event
///
/// MQTT carries no event timestamp, so arrival time is used.
fn event_from_payload(msg: Message<Bytes>) -> Message<Event> {
    Message {
        value: Event::now("mqtt", msg.value),
        key: msg.key,
        topic: msg.topic,
    }
}

/// Unwrap an event back into its raw payload
fn payload_from_event(msg: Message<Event>) -> Message<Bytes> {
    Message {
        value: msg.value.raw_log,
        key: msg.key,
        topic: msg.topic,
    }
}

/// An [`MqttSource`] producing normalized events
pub struct MqttEventSource {
    inner: MqttSource,
}

impl MqttEventSource {
    /// Wrap an MQTT source
    pub fn new(inner: MqttSource) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Source<Event> for MqttEventSource {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        self.inner.run(cancel).await
    }

    async fn recv(&self, cancel: &CancellationToken) -> Result<MsgAck<Event>, BoxError> {
        let MsgAck { msg, ack } = self.inner.recv(cancel).await?;
        Ok(MsgAck::new(event_from_payload(msg), ack))
    }
}

/// An [`MqttDestination`] consuming normalized events
pub struct MqttEventDestination {
    inner: MqttDestination,
}

impl MqttEventDestination {
    /// Wrap an MQTT destination
    pub fn new(inner: MqttDestination) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Destination<Event> for MqttEventDestination {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        self.inner.run(cancel).await
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<Event>>,
    ) -> Result<(), BoxError> {
        let payloads = msgs.into_iter().map(payload_from_event).collect();
        self.inner.send(cancel, ack, payloads).await
    }
}
