//! Stdout destination - JSON lines output
//!
//! Prints each event as one JSON line. Batches come from an embedded
//! [`Batcher`], so flush length, latency, and parallelism are all
//! configurable the same way as for any batching sink. Not intended for
//! high-throughput production use.
//!
//! # Example Output
//!
//! ```text
//! {"timestamp":"2024-05-01T12:00:00Z","sourceType":"journald","rawLog":"Started Session 7."}
//! {"timestamp":"2024-05-01T12:00:01Z","sourceType":"mqtt","rawLog":"{\"reading\":42}"}
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use freight_batch::{BatchConfig, Batcher, Flush, Result as BatchResult};
use freight_protocol::{AckFn, BoxError, Destination, Event, Message};

/// Writes each event in a batch as one JSON line
///
/// Generic over the writer so tests can capture output; the destination
/// uses stdout.
pub struct JsonLinesFlush<W> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Send + Unpin> JsonLinesFlush<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Send + Unpin> Flush<Event> for JsonLinesFlush<W> {
    async fn flush(
        &self,
        _cancel: &CancellationToken,
        batch: &[Message<Event>],
    ) -> std::result::Result<(), BoxError> {
        let mut lines = String::new();
        for msg in batch {
            lines.push_str(&serde_json::to_string(&msg.value)?);
            lines.push('\n');
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(lines.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// JSON-lines printer destination over stdout
pub struct StdoutDestination {
    batcher: Batcher<Event>,
}

impl StdoutDestination {
    /// Create a stdout destination with the given batching knobs
    pub fn new(config: BatchConfig) -> BatchResult<Self> {
        let batcher = Batcher::new(config, JsonLinesFlush::new(tokio::io::stdout()))?;
        Ok(Self { batcher })
    }
}

#[async_trait]
impl Destination<Event> for StdoutDestination {
    async fn run(&self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        self.batcher.run(cancel).await.map_err(Into::into)
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<Event>>,
    ) -> std::result::Result<(), BoxError> {
        self.batcher
            .send(cancel, ack, msgs)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod stdout_test;
