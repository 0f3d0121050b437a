//! Flush error policy
//!
//! Invoked once per failed batch. The batcher never retries on its own;
//! retry-with-backoff, dead-letter routing, or log-and-drop all live
//! behind this seam, and the batcher only acts on the returned decision.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use freight_protocol::{BoxError, Message};

/// What to do about a failed flush
#[derive(Debug)]
pub enum FlushDecision {
    /// The policy handled the failure; acknowledge the batch as if the
    /// flush had succeeded.
    Handled,

    /// The batch is handled but deliberately unconfirmed: resolve the
    /// batcher's bookkeeping without invoking the upstream
    /// acknowledgment, so the source redelivers after a restart.
    DontAck,

    /// Abort the pipeline: `run` terminates with this error and no
    /// further batches are dispatched.
    Fatal(BoxError),
}

/// Decides the fate of each failed flush
#[async_trait]
pub trait ErrorPolicy<T>: Send + Sync {
    /// Decide what to do about `err`, which failed `batch`
    async fn on_flush_error(
        &self,
        cancel: &CancellationToken,
        err: BoxError,
        batch: &[Message<T>],
    ) -> FlushDecision;
}

/// The default policy: every flush error is fatal, unchanged
pub struct Raise;

#[async_trait]
impl<T: Send + Sync> ErrorPolicy<T> for Raise {
    async fn on_flush_error(
        &self,
        _cancel: &CancellationToken,
        err: BoxError,
        _batch: &[Message<T>],
    ) -> FlushDecision {
        FlushDecision::Fatal(err)
    }
}
