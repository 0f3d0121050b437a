use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use freight_batch::{BatchConfig, Flush};
use freight_protocol::{Destination, Event, Message};

use super::{JsonLinesFlush, StdoutDestination};

fn event(source_type: &str, raw: &str) -> Message<Event> {
    Message::new(Event {
        timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        source_type: source_type.into(),
        raw_log: Bytes::copy_from_slice(raw.as_bytes()),
    })
}

#[tokio::test]
async fn test_flush_writes_one_json_line_per_event() {
    let flush = JsonLinesFlush::new(Vec::new());
    let cancel = CancellationToken::new();

    flush
        .flush(
            &cancel,
            &[event("journald", "line one"), event("mqtt", "line two")],
        )
        .await
        .unwrap();

    let written = flush.writer.lock().await.clone();
    let output = String::from_utf8(written).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["sourceType"], "journald");
    assert_eq!(first["rawLog"], "line one");

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["sourceType"], "mqtt");
    assert_eq!(second["rawLog"], "line two");
}

#[tokio::test]
async fn test_destination_flushes_and_acks() {
    let config = BatchConfig::new()
        .with_flush_length(8)
        .with_flush_frequency(Some(Duration::from_millis(5)));
    let destination = Arc::new(StdoutDestination::new(config).unwrap());

    let cancel = CancellationToken::new();
    let runner = {
        let destination = destination.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { destination.run(cancel).await })
    };

    let (tx, rx) = oneshot::channel();
    let ack = Box::new(move || {
        let _ = tx.send(());
    });
    destination
        .send(&cancel, Some(ack), vec![event("journald", "hello")])
        .await
        .unwrap();

    timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
    cancel.cancel();
    runner.await.unwrap().unwrap();
}
