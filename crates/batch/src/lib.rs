//! Freight Batch - Batching destination core
//!
//! The layer between the generic message pipeline and a concrete sink.
//! A [`Batcher`] buffers variable-rate input, flushes it in bounded-size /
//! bounded-latency groups, runs flushes with bounded parallelism, applies
//! a pluggable error policy per flush, and resolves acknowledgment for
//! every accepted message exactly once.
//!
//! # Architecture
//!
//! ```text
//! send() ──> [intake queue] ──> [open batch] ──┬─ length reached ─┐
//!                                              └─ timer fired ────┤
//!                                                                 v
//!                              [semaphore: flush_parallelism] [dispatch]
//!                                                                 │
//!                                      [flush worker] <───────────┘
//!                                        │ ok / policy decision
//!                                        v
//!                                 ack resolution ──> upstream ack
//! ```
//!
//! # Key Design
//!
//! - **Backpressure**: the intake queue holds a single envelope and
//!   dispatch blocks on the flush semaphore, so a saturated sink
//!   backpressures `send` callers instead of buffering unboundedly.
//! - **Acknowledgment**: each `send` call's messages share one countdown
//!   [`Ack`](freight_protocol::Ack); the caller's ack fires exactly once,
//!   when the last covering batch resolves, regardless of order.
//! - **Error policy**: flush failures are never retried by the batcher
//!   itself. The [`ErrorPolicy`] decides per failed batch: acknowledge
//!   anyway, skip acknowledgment, or abort the pipeline.
//! - **Shutdown**: cancelling `run`'s token drains in-flight work under a
//!   grace period; a sink that never completes yields the distinguished
//!   [`BatchError::Deadlock`] instead of hanging forever.
//!
//! # Example
//!
//! ```ignore
//! use freight_batch::{BatchConfig, Batcher, Flush};
//!
//! let config = BatchConfig::new()
//!     .with_flush_length(64)
//!     .with_flush_frequency(Some(Duration::from_secs(1)));
//! let batcher = Batcher::new(config, HttpFlush::new(endpoint))?;
//!
//! // Run the engine, concurrently with send() callers.
//! tokio::spawn(async move { batcher.run(cancel).await });
//! ```

mod batcher;
mod config;
mod error;
mod flush;
mod metrics;
mod policy;

pub use batcher::Batcher;
pub use config::{
    BatchConfig, DEFAULT_FLUSH_LENGTH, DEFAULT_FLUSH_PARALLELISM, DEFAULT_STOP_TIMEOUT,
};
pub use error::{BatchError, Result};
pub use flush::Flush;
pub use metrics::{BatcherMetrics, MetricsSnapshot};
pub use policy::{ErrorPolicy, FlushDecision, Raise};
