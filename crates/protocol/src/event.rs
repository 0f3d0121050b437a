//! Normalized event record
//!
//! Sources produce many shapes of raw data; the daemon normalizes them
//! into `Event` before routing, so destinations only deal with one type.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized log/event record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// When the event happened, per the producing source
    pub timestamp: DateTime<Utc>,

    /// Which source type produced it ("journald", "mqtt", ...)
    pub source_type: String,

    /// The raw record as received, unparsed
    #[serde(with = "raw_log_serde")]
    pub raw_log: Bytes,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn now(source_type: impl Into<String>, raw_log: impl Into<Bytes>) -> Self {
        Self {
            timestamp: Utc::now(),
            source_type: source_type.into(),
            raw_log: raw_log.into(),
        }
    }
}

/// Raw log bytes serialize as a string
///
/// Log lines are text in practice; non-UTF-8 bytes are replaced rather
/// than round-tripped.
mod raw_log_serde {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Bytes::from(s.into_bytes()))
    }
}
