//! The batching engine
//!
//! One open batch, a single-slot intake queue, a counting semaphore
//! capping concurrent flushes, and a drain phase with a deadlock watchdog.
//!
//! # Lifecycle
//!
//! ```text
//! Running ──(cancel)──> Draining ──(all batches resolved)──> Ok(())
//!    │                      │
//!    │                      └──(stop_timeout elapsed)──> Err(Deadlock)
//!    └──(fatal policy decision)──> Err(flush error)
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use async_trait::async_trait;
use freight_protocol::{Ack, AckFn, BoxError, Destination, Message};

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::flush::Flush;
use crate::metrics::{BatcherMetrics, MetricsSnapshot};
use crate::policy::{ErrorPolicy, FlushDecision, Raise};

/// A message plus its share of the covering acknowledgment
struct Envelope<T> {
    msg: Message<T>,
    ack: Ack,
}

/// First fatal error, recorded by whichever worker loses the race last
type FatalSlot = Arc<Mutex<Option<BoxError>>>;

/// Outcome of handing a closed batch to the worker pool
enum Dispatch<T> {
    /// A worker took the batch
    Done,
    /// A fatal decision was recorded while waiting for a flush slot;
    /// the batch was not dispatched
    Fatal,
    /// Shutdown began while waiting for a flush slot; the batch is
    /// returned so the drain phase can dispatch it
    Interrupted(Vec<Envelope<T>>),
}

/// Why the accumulation loop stopped
enum Exit {
    /// The run token was cancelled - drain and terminate
    Drain,
    /// A fatal flush decision was recorded
    Fatal,
}

/// Batching destination
///
/// Accumulates messages from [`send`](Batcher::send) into batches closed
/// by length or by latency, and flushes them through the supplied
/// [`Flush`] implementation under [`run`](Batcher::run)'s control.
/// Implements [`Destination`], so a pipeline can use it like any other
/// destination.
pub struct Batcher<T> {
    config: BatchConfig,
    flush: Arc<dyn Flush<T>>,
    policy: Arc<dyn ErrorPolicy<T>>,
    intake_tx: mpsc::Sender<Envelope<T>>,
    // Taken exactly once by run()
    intake_rx: Mutex<Option<mpsc::Receiver<Envelope<T>>>>,
    metrics: Arc<BatcherMetrics>,
}

impl<T: Send + Sync + 'static> Batcher<T> {
    /// Create a batcher with the default [`Raise`] error policy
    ///
    /// Fails fast on an invalid config.
    pub fn new<F>(config: BatchConfig, flush: F) -> Result<Self>
    where
        F: Flush<T> + 'static,
    {
        config.validate()?;
        // Single-slot hand-off: admission blocks as soon as the open
        // batch cannot take more work, pushing backpressure to senders.
        let (intake_tx, intake_rx) = mpsc::channel(1);
        Ok(Self {
            config,
            flush: Arc::new(flush),
            policy: Arc::new(Raise),
            intake_tx,
            intake_rx: Mutex::new(Some(intake_rx)),
            metrics: Arc::new(BatcherMetrics::new()),
        })
    }

    /// Replace the error policy
    #[must_use]
    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: ErrorPolicy<T> + 'static,
    {
        self.policy = Arc::new(policy);
        self
    }

    /// Snapshot of the flush counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Submit messages sharing a single upstream acknowledgment
    ///
    /// Suspends until every message has been accepted into the batcher's
    /// buffer. Returns [`BatchError::Cancelled`] if `cancel` fires first
    /// (no further messages from this call are accepted) and
    /// [`BatchError::Closed`] once [`run`](Batcher::run) has terminated.
    /// Downstream flush failures never surface here; they surface through
    /// `run`'s result or through the acknowledgment never firing.
    ///
    /// The acknowledgment fires exactly once, after the last batch
    /// covering these messages resolves. An empty `msgs` has nothing to
    /// confirm and fires the acknowledgment immediately.
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<T>>,
    ) -> Result<()> {
        let shared = Ack::shared(ack, msgs.len());
        for msg in msgs {
            let envelope = Envelope {
                msg,
                ack: shared.clone(),
            };
            tokio::select! {
                res = self.intake_tx.send(envelope) => {
                    if res.is_err() {
                        return Err(BatchError::Closed);
                    }
                }
                _ = cancel.cancelled() => return Err(BatchError::Cancelled),
            }
        }
        Ok(())
    }

    /// Run the batching engine until cancellation or a fatal flush error
    ///
    /// Must be invoked exactly once per instance, concurrently with
    /// [`send`](Batcher::send) callers; a second invocation returns
    /// [`BatchError::AlreadyRunning`].
    ///
    /// Returns `Ok(())` on clean shutdown, the fatal error decided by the
    /// error policy, or [`BatchError::Deadlock`] if pending work did not
    /// resolve within [`stop_timeout`](BatchConfig::stop_timeout) after
    /// cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut intake = self
            .intake_rx
            .lock()
            .take()
            .ok_or(BatchError::AlreadyRunning)?;

        let semaphore = Arc::new(Semaphore::new(self.config.flush_parallelism));
        let mut workers: JoinSet<()> = JoinSet::new();
        let fatal: FatalSlot = Arc::new(Mutex::new(None));
        let fatal_signal = CancellationToken::new();
        // Handed to in-flight flushes. Deliberately not the run token:
        // graceful shutdown lets flushes finish; this fires only once the
        // batcher has given up on them.
        let flush_cancel = CancellationToken::new();
        let never = CancellationToken::new();

        let mut open: Vec<Envelope<T>> = Vec::with_capacity(self.config.flush_length);
        let mut deadline: Option<Instant> = None;
        // Batch closed but not yet dispatched when shutdown began
        let mut undispatched: Option<Vec<Envelope<T>>> = None;

        let exit = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Exit::Drain,
                _ = fatal_signal.cancelled() => break Exit::Fatal,
                maybe = intake.recv() => {
                    match maybe {
                        Some(envelope) => {
                            if open.is_empty() {
                                if let Some(frequency) = self.config.flush_frequency {
                                    deadline = Some(Instant::now() + frequency);
                                }
                            }
                            open.push(envelope);
                            if open.len() >= self.config.flush_length {
                                deadline = None;
                                let batch = std::mem::take(&mut open);
                                match self
                                    .dispatch(&mut workers, &semaphore, &flush_cancel,
                                              &fatal, &fatal_signal, &cancel, batch)
                                    .await
                                {
                                    Dispatch::Done => {}
                                    Dispatch::Fatal => break Exit::Fatal,
                                    Dispatch::Interrupted(batch) => {
                                        undispatched = Some(batch);
                                        break Exit::Drain;
                                    }
                                }
                            }
                        }
                        // All senders dropped; nothing more will arrive.
                        None => break Exit::Drain,
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    if !open.is_empty() {
                        let batch = std::mem::take(&mut open);
                        match self
                            .dispatch(&mut workers, &semaphore, &flush_cancel,
                                      &fatal, &fatal_signal, &cancel, batch)
                            .await
                        {
                            Dispatch::Done => {}
                            Dispatch::Fatal => break Exit::Fatal,
                            Dispatch::Interrupted(batch) => {
                                undispatched = Some(batch);
                                break Exit::Drain;
                            }
                        }
                    }
                }
                // Reap finished workers so the join set does not grow
                // without bound on long runs.
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(join_err) = joined {
                        record_fatal(&fatal, &fatal_signal, worker_panic(join_err));
                        break Exit::Fatal;
                    }
                }
            }
        };

        if let Exit::Fatal = exit {
            let err = take_fatal(&fatal);
            error!(error = %err, "batcher terminating on fatal flush error");
            // In-flight flushes are released, never force-aborted; their
            // acknowledgments stay unresolved unless they still succeed.
            flush_cancel.cancel();
            workers.detach_all();
            return Err(err);
        }

        debug!(
            pending = workers.len() + usize::from(undispatched.is_some()) + usize::from(!open.is_empty()),
            "draining"
        );

        let drain = async {
            if let Some(batch) = undispatched.take() {
                if let Dispatch::Fatal = self
                    .dispatch(&mut workers, &semaphore, &flush_cancel,
                              &fatal, &fatal_signal, &never, batch)
                    .await
                {
                    return Err(());
                }
            }
            if !open.is_empty() {
                let batch = std::mem::take(&mut open);
                if let Dispatch::Fatal = self
                    .dispatch(&mut workers, &semaphore, &flush_cancel,
                              &fatal, &fatal_signal, &never, batch)
                    .await
                {
                    return Err(());
                }
            }
            while let Some(joined) = workers.join_next().await {
                if let Err(join_err) = joined {
                    record_fatal(&fatal, &fatal_signal, worker_panic(join_err));
                    return Err(());
                }
            }
            Ok(())
        };

        enum Outcome {
            Drained(std::result::Result<(), ()>),
            Fatal,
            TimedOut,
        }

        let outcome = tokio::select! {
            drained = drain => Outcome::Drained(drained),
            _ = fatal_signal.cancelled() => Outcome::Fatal,
            _ = sleep(self.config.stop_timeout) => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Drained(Ok(())) => {
                // A worker may have recorded a fatal error right as the
                // drain finished joining it; the error still wins.
                if let Some(err) = self.take_recorded(&fatal) {
                    flush_cancel.cancel();
                    return Err(err);
                }
                debug!("batcher drained cleanly");
                Ok(())
            }
            Outcome::Drained(Err(())) | Outcome::Fatal => {
                let err = take_fatal(&fatal);
                error!(error = %err, "batcher terminating on fatal flush error during drain");
                flush_cancel.cancel();
                workers.detach_all();
                Err(err)
            }
            Outcome::TimedOut => {
                warn!(
                    in_flight = workers.len(),
                    timeout = ?self.config.stop_timeout,
                    "shutdown deadlocked; abandoning pending flushes"
                );
                flush_cancel.cancel();
                workers.detach_all();
                Err(BatchError::Deadlock)
            }
        }
    }

    fn take_recorded(&self, fatal: &FatalSlot) -> Option<BatchError> {
        fatal.lock().take().map(BatchError::Flush)
    }

    /// Hand a closed batch to the worker pool
    ///
    /// Blocks while the pool is saturated - the backpressure point that
    /// ultimately blocks `send` callers. `run_cancel` aborts the wait
    /// during the running phase; the drain phase passes a token that
    /// never fires and relies on the stop-timeout watchdog instead.
    async fn dispatch(
        &self,
        workers: &mut JoinSet<()>,
        semaphore: &Arc<Semaphore>,
        flush_cancel: &CancellationToken,
        fatal: &FatalSlot,
        fatal_signal: &CancellationToken,
        run_cancel: &CancellationToken,
        batch: Vec<Envelope<T>>,
    ) -> Dispatch<T> {
        tokio::select! {
            _ = fatal_signal.cancelled() => Dispatch::Fatal,
            _ = run_cancel.cancelled() => Dispatch::Interrupted(batch),
            permit = semaphore.clone().acquire_owned() => {
                let Ok(permit) = permit else {
                    // The semaphore is never closed while run is alive.
                    return Dispatch::Fatal;
                };
                let flush = self.flush.clone();
                let policy = self.policy.clone();
                let metrics = self.metrics.clone();
                let flush_cancel = flush_cancel.clone();
                let fatal = fatal.clone();
                let fatal_signal = fatal_signal.clone();
                workers.spawn(async move {
                    let _permit = permit;
                    flush_batch(
                        flush, policy, metrics, flush_cancel, fatal, fatal_signal, batch,
                    )
                    .await;
                });
                Dispatch::Done
            }
        }
    }
}

/// Execute one flush and resolve its acknowledgments
async fn flush_batch<T: Send + Sync>(
    flush: Arc<dyn Flush<T>>,
    policy: Arc<dyn ErrorPolicy<T>>,
    metrics: Arc<BatcherMetrics>,
    flush_cancel: CancellationToken,
    fatal: FatalSlot,
    fatal_signal: CancellationToken,
    batch: Vec<Envelope<T>>,
) {
    let (msgs, acks): (Vec<_>, Vec<_>) = batch
        .into_iter()
        .map(|envelope| (envelope.msg, envelope.ack))
        .unzip();

    match flush.flush(&flush_cancel, &msgs).await {
        Ok(()) => {
            metrics.flush_ok(msgs.len() as u64);
            for ack in &acks {
                ack.complete_one();
            }
        }
        Err(err) => {
            metrics.flush_err();
            match policy.on_flush_error(&flush_cancel, err, &msgs).await {
                FlushDecision::Handled => {
                    for ack in &acks {
                        ack.complete_one();
                    }
                }
                FlushDecision::DontAck => {
                    debug!(len = msgs.len(), "batch handled without acknowledgment");
                    for ack in &acks {
                        ack.discharge_one();
                    }
                }
                FlushDecision::Fatal(err) => {
                    // Acknowledgments drop unresolved: upstream is never
                    // told these messages were handled, so a
                    // position-persisting source redelivers them.
                    record_fatal(&fatal, &fatal_signal, err);
                }
            }
        }
    }
}

fn record_fatal(fatal: &FatalSlot, fatal_signal: &CancellationToken, err: BoxError) {
    let mut slot = fatal.lock();
    if slot.is_none() {
        *slot = Some(err);
    }
    fatal_signal.cancel();
}

fn take_fatal(fatal: &FatalSlot) -> BatchError {
    match fatal.lock().take() {
        Some(err) => BatchError::Flush(err),
        None => BatchError::Flush("flush worker failed".into()),
    }
}

fn worker_panic(join_err: tokio::task::JoinError) -> BoxError {
    format!("flush worker panicked: {join_err}").into()
}

#[async_trait]
impl<T: Send + Sync + 'static> Destination<T> for Batcher<T> {
    async fn run(&self, cancel: CancellationToken) -> std::result::Result<(), BoxError> {
        Batcher::run(self, cancel).await.map_err(Into::into)
    }

    async fn send(
        &self,
        cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<T>>,
    ) -> std::result::Result<(), BoxError> {
        Batcher::send(self, cancel, ack, msgs)
            .await
            .map_err(Into::into)
    }
}
