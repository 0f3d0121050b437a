//! Windows Event Log transcoder
//!
//! Converts the XML rendering of a Windows event into a JSON document
//! with a fixed shape:
//!
//! ```text
//! { "event": {
//!     "eventDataMap"?: { name: value, ... },   // <Data Name="...">
//!     "eventData"?:    [ value, ... ],         // unnamed <Data>
//!     "userData"?:     { ... },                // arbitrary nested XML
//!     "system":        { provider, eventId, ..., security } } }
//! ```
//!
//! `eventDataMap`, `eventData` and `userData` are omitted when empty.
//! The live event subscription API is Windows-only and lives outside this
//! crate; the transcoder is the portable piece.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event as Xml};
use quick_xml::Reader;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Transcoding errors
#[derive(Debug, Error)]
pub enum WindowsEventError {
    /// The input is not well-formed XML
    #[error("malformed event xml: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be decoded
    #[error("malformed event attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// A `SystemTime` attribute that is not an RFC 3339 timestamp
    #[error("invalid SystemTime timestamp '{0}'")]
    Timestamp(String),

    /// The document ended inside an element
    #[error("unexpected end of event xml")]
    UnexpectedEof,

    /// No `<Event>` element in the input
    #[error("input contains no Event element")]
    MissingEvent,
}

/// The transcoded event, ready for JSON serialization
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct JsonEvent {
    /// The single top-level `event` object
    pub event: EventBody,
}

/// Body of the `event` object
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    /// `<Data Name="...">` entries, keyed by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub event_data_map: BTreeMap<String, String>,

    /// Unnamed `<Data>` entries, in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event_data: Vec<String>,

    /// The `<UserData>` subtree as nested JSON objects
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub user_data: Map<String, Value>,

    /// The `<System>` section
    pub system: System,
}

/// The `<System>` section of an event
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct System {
    /// Event provider
    pub provider: Provider,
    /// Event identifier
    pub event_id: String,
    /// Event schema version
    pub version: String,
    /// Severity level
    pub level: String,
    /// Task category
    pub task: String,
    /// Opcode
    pub opcode: String,
    /// Keyword bitmask
    pub keywords: String,
    /// Record timestamp
    pub time_created: TimeCreated,
    /// Monotonic record id within the channel
    pub event_record_id: String,
    /// Correlation section (always present, often empty)
    pub correlation: Correlation,
    /// Producing process and thread
    pub execution: Execution,
    /// Channel name
    pub channel: String,
    /// Computer name
    pub computer: String,
    /// Security section
    pub security: Security,
}

/// `<Provider Name=".." Guid="..">`
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    /// Provider name
    pub name: String,
    /// Provider GUID
    pub guid: String,
}

/// `<TimeCreated SystemTime="..">`
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCreated {
    /// When the record was created
    pub system_time: Option<DateTime<Utc>>,
}

/// `<Correlation>`
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Correlation {}

/// `<Execution ProcessID=".." ThreadID="..">`
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Producing process id
    pub process_id: String,
    /// Producing thread id
    pub thread_id: String,
}

/// `<Security UserID="..">`
#[derive(Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    /// SID of the producing principal
    pub user_id: String,
}

/// Transcode one event's XML rendering into its JSON shape
pub fn transcode(xml: &str) -> Result<JsonEvent, WindowsEventError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut body = EventBody::default();
    let mut saw_event = false;

    loop {
        match reader.read_event()? {
            Xml::Start(start) => match start.local_name().as_ref() {
                b"Event" => saw_event = true,
                b"System" => parse_system(&mut reader, &mut body.system)?,
                b"EventData" => parse_event_data(&mut reader, &mut body)?,
                b"UserData" => {
                    if let Value::Object(map) = parse_user_value(&mut reader)? {
                        body.user_data = map;
                    }
                }
                _ => {
                    reader.read_to_end(start.name())?;
                }
            },
            Xml::Empty(start) => {
                if start.local_name().as_ref() == b"Event" {
                    saw_event = true;
                }
            }
            Xml::Eof => break,
            _ => {}
        }
    }

    if !saw_event {
        return Err(WindowsEventError::MissingEvent);
    }
    Ok(JsonEvent { event: body })
}

/// Read the `<System>` children into their fixed fields
fn parse_system(
    reader: &mut Reader<&[u8]>,
    system: &mut System,
) -> Result<(), WindowsEventError> {
    loop {
        match reader.read_event()? {
            Xml::Start(child) => {
                let name = child.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Provider" => {
                        fill_provider(&child, &mut system.provider)?;
                        reader.read_to_end(child.name())?;
                    }
                    b"TimeCreated" => {
                        fill_time_created(&child, &mut system.time_created)?;
                        reader.read_to_end(child.name())?;
                    }
                    b"Execution" => {
                        fill_execution(&child, &mut system.execution)?;
                        reader.read_to_end(child.name())?;
                    }
                    b"Security" => {
                        fill_security(&child, &mut system.security)?;
                        reader.read_to_end(child.name())?;
                    }
                    b"EventID" => system.event_id = read_text(reader, &child)?,
                    b"Version" => system.version = read_text(reader, &child)?,
                    b"Level" => system.level = read_text(reader, &child)?,
                    b"Task" => system.task = read_text(reader, &child)?,
                    b"Opcode" => system.opcode = read_text(reader, &child)?,
                    b"Keywords" => system.keywords = read_text(reader, &child)?,
                    b"EventRecordID" => system.event_record_id = read_text(reader, &child)?,
                    b"Channel" => system.channel = read_text(reader, &child)?,
                    b"Computer" => system.computer = read_text(reader, &child)?,
                    _ => {
                        reader.read_to_end(child.name())?;
                    }
                }
            }
            Xml::Empty(child) => match child.local_name().as_ref() {
                b"Provider" => fill_provider(&child, &mut system.provider)?,
                b"TimeCreated" => fill_time_created(&child, &mut system.time_created)?,
                b"Execution" => fill_execution(&child, &mut system.execution)?,
                b"Security" => fill_security(&child, &mut system.security)?,
                _ => {}
            },
            Xml::End(_) => break,
            Xml::Eof => return Err(WindowsEventError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(())
}

/// Read `<EventData>`: named `<Data>` entries go to the map, unnamed
/// ones append to the list
fn parse_event_data(
    reader: &mut Reader<&[u8]>,
    body: &mut EventBody,
) -> Result<(), WindowsEventError> {
    loop {
        match reader.read_event()? {
            Xml::Start(child) => {
                if child.local_name().as_ref() == b"Data" {
                    let name = attr(&child, b"Name")?;
                    let value = read_text(reader, &child)?;
                    match name {
                        Some(name) if !name.is_empty() => {
                            body.event_data_map.insert(name, value);
                        }
                        _ => body.event_data.push(value),
                    }
                } else {
                    reader.read_to_end(child.name())?;
                }
            }
            Xml::Empty(child) => {
                if child.local_name().as_ref() == b"Data" {
                    match attr(&child, b"Name")? {
                        Some(name) if !name.is_empty() => {
                            body.event_data_map.insert(name, String::new());
                        }
                        _ => body.event_data.push(String::new()),
                    }
                }
            }
            Xml::End(_) => break,
            Xml::Eof => return Err(WindowsEventError::UnexpectedEof),
            _ => {}
        }
    }
    Ok(())
}

/// Read an arbitrary subtree as a JSON value
///
/// Elements with children become objects, text-only elements become
/// strings, empty elements are dropped.
fn parse_user_value(reader: &mut Reader<&[u8]>) -> Result<Value, WindowsEventError> {
    let mut children = Map::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Xml::Start(child) => {
                let name = String::from_utf8_lossy(child.local_name().as_ref()).into_owned();
                match parse_user_value(reader)? {
                    Value::String(s) if s.is_empty() => {}
                    value => {
                        children.insert(name, value);
                    }
                }
            }
            Xml::Empty(_) => {}
            Xml::Text(t) => text.push_str(&t.unescape()?),
            // Every child element is consumed by the recursion, so any
            // end tag seen here closes this element.
            Xml::End(_) => break,
            Xml::Eof => return Err(WindowsEventError::UnexpectedEof),
            _ => {}
        }
    }

    if !children.is_empty() {
        Ok(Value::Object(children))
    } else {
        Ok(Value::String(text))
    }
}

fn read_text(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
) -> Result<String, WindowsEventError> {
    Ok(reader.read_text(start.name())?.into_owned())
}

fn attr(start: &BytesStart, key: &[u8]) -> Result<Option<String>, WindowsEventError> {
    for attribute in start.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == key {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn fill_provider(start: &BytesStart, provider: &mut Provider) -> Result<(), WindowsEventError> {
    provider.name = attr(start, b"Name")?.unwrap_or_default();
    provider.guid = attr(start, b"Guid")?.unwrap_or_default();
    Ok(())
}

fn fill_time_created(
    start: &BytesStart,
    time_created: &mut TimeCreated,
) -> Result<(), WindowsEventError> {
    if let Some(raw) = attr(start, b"SystemTime")? {
        let parsed = DateTime::parse_from_rfc3339(&raw)
            .map_err(|_| WindowsEventError::Timestamp(raw))?;
        time_created.system_time = Some(parsed.with_timezone(&Utc));
    }
    Ok(())
}

fn fill_execution(start: &BytesStart, execution: &mut Execution) -> Result<(), WindowsEventError> {
    execution.process_id = attr(start, b"ProcessID")?.unwrap_or_default();
    execution.thread_id = attr(start, b"ThreadID")?.unwrap_or_default();
    Ok(())
}

fn fill_security(start: &BytesStart, security: &mut Security) -> Result<(), WindowsEventError> {
    security.user_id = attr(start, b"UserID")?.unwrap_or_default();
    Ok(())
}

#[cfg(test)]
mod windows_test;
