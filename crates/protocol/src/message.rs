//! Message envelope
//!
//! The immutable unit of data passed through the whole pipeline. A message
//! is constructed once, by a source adapter or by a caller handing data to
//! a destination, and never mutated afterwards.

use crate::ack::AckFn;

/// Immutable message envelope
///
/// `key` and `topic` are optional routing metadata. What they mean is up to
/// the adapters on either end: the MQTT source fills `topic` with the
/// publish topic, the MQTT destination uses `topic` as a per-message
/// override of its configured publish topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    /// The payload
    pub value: T,

    /// Optional partitioning / identity key
    pub key: Option<String>,

    /// Optional routing topic
    pub topic: Option<String>,
}

impl<T> Message<T> {
    /// Create a message with no routing metadata
    pub fn new(value: T) -> Self {
        Self {
            value,
            key: None,
            topic: None,
        }
    }

    /// Set the key
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the topic
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// A message paired with its acknowledgment action
///
/// The hand-off unit between a source and the pipeline. The ack, when
/// present, must be invoked exactly once - after the message has been
/// durably handed off downstream. `None` means the source does not need
/// delivery confirmation.
pub struct MsgAck<T> {
    /// The message
    pub msg: Message<T>,

    /// Acknowledgment action, invoked on confirmed delivery
    pub ack: Option<AckFn>,
}

impl<T> MsgAck<T> {
    /// Pair a message with an optional acknowledgment action
    pub fn new(msg: Message<T>, ack: Option<AckFn>) -> Self {
        Self { msg, ack }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for MsgAck<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgAck")
            .field("msg", &self.msg)
            .field("ack", &self.ack.is_some())
            .finish()
    }
}
