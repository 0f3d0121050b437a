//! The sink operation

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use freight_protocol::{BoxError, Message};

/// The user-supplied sink operation executed against one batch
///
/// Invoked by a flush worker with read-only access to the batch. The
/// token passed here is not the run token: a graceful shutdown never
/// force-cancels an in-flight flush. It fires only once the batcher has
/// given up on the flush (fatal error or deadlock timeout), so a
/// well-behaved implementation should observe it and return promptly -
/// one that ignores it is what the deadlock timeout exists for.
#[async_trait]
pub trait Flush<T>: Send + Sync {
    /// Deliver `batch` to the sink
    async fn flush(&self, cancel: &CancellationToken, batch: &[Message<T>]) -> Result<(), BoxError>;
}
