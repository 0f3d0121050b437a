//! Journald source
//!
//! Tails the system journal by running `journalctl -b -af -o json` as a
//! child process and reading its stdout line by line. Each record's
//! acknowledgment persists that record's `__CURSOR` as the high
//! watermark, so a restart resumes exactly after the last acknowledged
//! record (`--after-cursor`). With no persisted cursor the source reads
//! all available history for the current boot.
//!
//! Records that fail to parse are logged and skipped, never fatal.

mod watermark;

pub use watermark::Watermark;

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use freight_protocol::{AckFn, BoxError, Cancelled, Event, Message, MsgAck, Source};

/// Default location of the persisted resume cursor
pub const DEFAULT_CURSOR_PATH: &str = "/tmp/freightd-journald-hwm";

/// Journald source configuration
#[derive(Debug, Clone)]
pub struct JournaldConfig {
    /// Where the high-watermark cursor is persisted
    pub cursor_path: PathBuf,
}

impl Default for JournaldConfig {
    fn default() -> Self {
        Self {
            cursor_path: PathBuf::from(DEFAULT_CURSOR_PATH),
        }
    }
}

impl JournaldConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cursor file path
    #[must_use]
    pub fn with_cursor_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor_path = path.into();
        self
    }
}

/// Journald source errors
#[derive(Debug, Error)]
pub enum JournaldError {
    /// The cursor file could not be opened or read
    #[error("high watermark file '{path}': {source}")]
    Watermark {
        /// Cursor file path
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// journalctl could not be started
    #[error("spawning journalctl: {0}")]
    Spawn(#[source] std::io::Error),

    /// journalctl was started without a stdout pipe
    #[error("journalctl has no stdout pipe")]
    NoStdout,

    /// Reading journalctl output failed
    #[error("reading journalctl output: {0}")]
    Read(#[source] std::io::Error),

    /// journalctl exited unsuccessfully
    #[error("journalctl exited with {0}")]
    Exited(std::process::ExitStatus),
}

/// Tails the system journal via `journalctl`
pub struct JournaldSource {
    config: JournaldConfig,
    tx: mpsc::Sender<MsgAck<Event>>,
    rx: tokio::sync::Mutex<mpsc::Receiver<MsgAck<Event>>>,
}

impl JournaldSource {
    /// Create a journald source
    pub fn new(config: JournaldConfig) -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            config,
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    async fn recv_loop(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        let watermark =
            Watermark::open(&self.config.cursor_path).map_err(|source| JournaldError::Watermark {
                path: self.config.cursor_path.display().to_string(),
                source,
            })?;
        let resume = watermark.load().map_err(|source| JournaldError::Watermark {
            path: self.config.cursor_path.display().to_string(),
            source,
        })?;

        let args = journalctl_args(resume.as_deref());
        debug!(args = ?args, "running journalctl");
        let mut child = Command::new("journalctl")
            .args(&args)
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(JournaldError::Spawn)?;
        let stdout = child.stdout.take().ok_or(JournaldError::NoStdout)?;
        let mut lines = BufReader::new(stdout).lines();

        // Outstanding acknowledgments, so end-of-stream waits for every
        // handed-off record to resolve before reaping the child.
        let outstanding = Arc::new(AtomicUsize::new(0));

        info!("reading journald");

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                next = lines.next_line() => match next {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) => return Err(JournaldError::Read(err).into()),
                },
            };

            let record: JournalRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(err) => {
                    warn!(error = %err, "skipping unparseable journald record");
                    continue;
                }
            };
            let timestamp = match parse_unix_microseconds(&record.realtime_timestamp) {
                Ok(timestamp) => timestamp,
                Err(err) => {
                    warn!(error = %err, "parsing journald timestamp");
                    DateTime::<Utc>::UNIX_EPOCH
                }
            };

            let event = Event {
                timestamp,
                source_type: "journald".into(),
                raw_log: Bytes::from(line.into_bytes()),
            };

            outstanding.fetch_add(1, Ordering::SeqCst);
            let ack: AckFn = {
                let watermark = watermark.clone();
                let cursor = record.cursor;
                let outstanding = outstanding.clone();
                Box::new(move || {
                    if let Err(err) = watermark.store(&cursor) {
                        error!(error = %err, "writing high watermark");
                    }
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                })
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                handed_off = self.tx.send(MsgAck::new(Message::new(event), Some(ack))) => {
                    if handed_off.is_err() {
                        break;
                    }
                }
            }
        }

        info!("waiting for journald acknowledgments");
        while outstanding.load(Ordering::SeqCst) > 0 {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(std::time::Duration::from_millis(10)) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let status = child.wait().await.map_err(JournaldError::Read)?;
        if status.success() {
            Ok(())
        } else {
            Err(JournaldError::Exited(status).into())
        }
    }
}

#[async_trait]
impl Source<Event> for JournaldSource {
    async fn run(&self, cancel: CancellationToken) -> Result<(), BoxError> {
        self.recv_loop(cancel).await
    }

    async fn recv(&self, cancel: &CancellationToken) -> Result<MsgAck<Event>, BoxError> {
        let mut rx = self.rx.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => Err(Cancelled.into()),
            received = rx.recv() => received.ok_or_else(|| Cancelled.into()),
        }
    }
}

/// Arguments for the `journalctl` invocation
///
/// With a persisted cursor the tail resumes right after it; otherwise
/// all history for this boot is read from the beginning.
fn journalctl_args(after_cursor: Option<&str>) -> Vec<String> {
    let mut args: Vec<String> = ["-b", "-af", "-o", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    match after_cursor {
        Some(cursor) => {
            args.push("--after-cursor".into());
            args.push(cursor.into());
        }
        None => {
            args.push("--since".into());
            args.push("1970-01-01 00:00:00".into());
        }
    }
    args
}

/// The journald fields every record is expected to carry
///
/// `journalctl -o json` emits many more; only these are read.
#[derive(Debug, Deserialize)]
pub struct JournalRecord {
    /// The log text; journald emits non-UTF-8 payloads as byte arrays
    #[serde(rename = "MESSAGE", default)]
    pub message: JournalText,

    /// Microseconds since the epoch, as a decimal string
    #[serde(rename = "__REALTIME_TIMESTAMP", default)]
    pub realtime_timestamp: String,

    /// Opaque resume position of this record
    #[serde(rename = "__CURSOR", default)]
    pub cursor: String,

    /// Originating unit or tag
    #[serde(rename = "SYSLOG_IDENTIFIER", default)]
    pub syslog_identifier: String,

    /// Host that produced the record
    #[serde(rename = "_HOSTNAME", default)]
    pub hostname: String,
}

/// Journal text that may arrive as a JSON string or as a byte array
#[derive(Debug, Default, PartialEq, Eq)]
pub struct JournalText(pub Vec<u8>);

impl<'de> Deserialize<'de> for JournalText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TextVisitor;

        impl<'de> Visitor<'de> for TextVisitor {
            type Value = JournalText;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or an array of bytes")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(JournalText(v.as_bytes().to_vec()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Ok(JournalText(bytes))
            }
        }

        deserializer.deserialize_any(TextVisitor)
    }
}

/// Parse a journald `__REALTIME_TIMESTAMP` (microseconds since epoch)
fn parse_unix_microseconds(s: &str) -> Result<DateTime<Utc>, String> {
    let micros: i64 = s
        .parse()
        .map_err(|err| format!("not a microsecond timestamp: {err}"))?;
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| format!("timestamp out of range: {micros}"))
}
