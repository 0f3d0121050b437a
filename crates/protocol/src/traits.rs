//! Source and destination traits
//!
//! The seams every adapter implements. Cancellation is explicit: every
//! suspending call takes a [`CancellationToken`] and must return promptly
//! with [`Cancelled`] when it fires.
//!
//! [`Cancelled`]: crate::Cancelled

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::ack::AckFn;
use crate::error::BoxError;
use crate::message::{Message, MsgAck};

/// A producer of messages
///
/// `recv` is driven repeatedly from one pump loop; `run` owns the
/// adapter's connection/IO lifecycle and is spawned alongside it.
#[async_trait]
pub trait Source<T>: Send + Sync {
    /// Run the source until cancellation or a transport failure
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError>;

    /// Receive the next message and its acknowledgment action
    ///
    /// The ack, when invoked, durably records that the message need not be
    /// redelivered (advance a cursor, ack a broker message). The pipeline
    /// invokes it only once delivery downstream is resolved.
    async fn recv(&self, cancel: &CancellationToken) -> Result<MsgAck<T>, BoxError>;
}

/// A consumer of messages
#[async_trait]
pub trait Destination<T>: Send + Sync {
    /// Run the destination until cancellation or a transport failure
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError>;

    /// Hand off one or more messages sharing a single acknowledgment
    ///
    /// The destination invokes `ack` once all messages are confirmed
    /// processed. A batching destination may resolve the ack long after
    /// `send` returns; `send` returning only means the messages were
    /// accepted.
    async fn send(
        &self,
        cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<T>>,
    ) -> Result<(), BoxError>;
}
