use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use freight_protocol::{
    AckFn, BoxError, Cancelled, Destination, Message, MsgAck, Source,
};

use super::{Pipeline, PipelineError};

// =============================================================================
// Test doubles
// =============================================================================

/// Serves a fixed set of messages, then blocks until cancellation
struct VecSource {
    items: tokio::sync::Mutex<VecDeque<MsgAck<String>>>,
}

impl VecSource {
    fn new(values: &[&str], acked: &Arc<AtomicUsize>) -> Self {
        let items = values
            .iter()
            .map(|v| {
                let acked = acked.clone();
                let ack: AckFn = Box::new(move || {
                    acked.fetch_add(1, Ordering::SeqCst);
                });
                MsgAck::new(Message::new((*v).to_string()), Some(ack))
            })
            .collect();
        Self {
            items: tokio::sync::Mutex::new(items),
        }
    }
}

#[async_trait]
impl Source<String> for VecSource {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        cancel.cancelled().await;
        Err(Box::new(Cancelled))
    }

    async fn recv(&self, cancel: &CancellationToken) -> Result<MsgAck<String>, BoxError> {
        if let Some(pair) = self.items.lock().await.pop_front() {
            return Ok(pair);
        }
        cancel.cancelled().await;
        Err(Box::new(Cancelled))
    }
}

/// Records every delivered value and confirms immediately
#[derive(Default)]
struct CollectingDestination {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Destination<String> for CollectingDestination {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        cancel.cancelled().await;
        Err(Box::new(Cancelled))
    }

    async fn send(
        &self,
        _cancel: &CancellationToken,
        ack: Option<AckFn>,
        msgs: Vec<Message<String>>,
    ) -> Result<(), BoxError> {
        self.seen.lock().extend(msgs.into_iter().map(|m| m.value));
        if let Some(ack) = ack {
            ack();
        }
        Ok(())
    }
}

/// Fails every send
struct FailingDestination;

#[async_trait]
impl Destination<String> for FailingDestination {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        cancel.cancelled().await;
        Err(Box::new(Cancelled))
    }

    async fn send(
        &self,
        _cancel: &CancellationToken,
        _ack: Option<AckFn>,
        _msgs: Vec<Message<String>>,
    ) -> Result<(), BoxError> {
        Err("send failed".into())
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(1), async {
        while !condition() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_fan_out_delivers_to_every_destination() {
    let acked = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(VecSource::new(&["hi", "hello"], &acked));
    let first = CollectingDestination::default();
    let second = CollectingDestination::default();
    let first_seen = first.seen.clone();
    let second_seen = second.seen.clone();

    let pipeline = Pipeline::builder()
        .source("memory", source)
        .destination("first", Arc::new(first))
        .destination("second", Arc::new(second))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let runner = {
        let cancel = cancel.clone();
        tokio::spawn(async move { pipeline.run(cancel).await })
    };

    wait_for(|| first_seen.lock().len() == 2 && second_seen.lock().len() == 2).await;
    assert_eq!(*first_seen.lock(), vec!["hi", "hello"]);
    assert_eq!(*second_seen.lock(), vec!["hi", "hello"]);

    // One ack per message, fired only after both destinations confirmed.
    wait_for(|| acked.load(Ordering::SeqCst) == 2).await;

    cancel.cancel();
    runner.await.unwrap().unwrap();
    assert_eq!(acked.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_destination_send_surfaces_through_run() {
    let acked = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(VecSource::new(&["hi"], &acked));

    let pipeline = Pipeline::builder()
        .source("memory", source)
        .destination("broken", Arc::new(FailingDestination))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let err = pipeline.run(cancel).await.unwrap_err();
    match err {
        PipelineError::Leg { leg, source } => {
            assert_eq!(leg, "pump:memory");
            assert_eq!(source.to_string(), "send failed");
        }
        other => panic!("expected leg failure, got: {other}"),
    }
    assert_eq!(acked.load(Ordering::SeqCst), 0, "failed delivery must not ack");
}

#[tokio::test]
async fn test_clean_shutdown_on_cancellation() {
    let acked = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(VecSource::new(&[], &acked));

    let pipeline = Pipeline::builder()
        .source("memory", source)
        .destination("sink", Arc::new(CollectingDestination::default()))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let runner = {
        let cancel = cancel.clone();
        tokio::spawn(async move { pipeline.run(cancel).await })
    };

    cancel.cancel();
    runner.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_builder_requires_source_and_destination() {
    let err = Pipeline::<String>::builder()
        .destination("sink", Arc::new(CollectingDestination::default()))
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoSources));

    let acked = Arc::new(AtomicUsize::new(0));
    let err = Pipeline::builder()
        .source("memory", Arc::new(VecSource::new(&[], &acked)))
        .build()
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoDestinations));
}
