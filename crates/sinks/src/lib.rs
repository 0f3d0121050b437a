//! Freight Sinks - Built-in destinations
//!
//! Destinations that ship with the daemon. Currently one: the stdout
//! printer, built directly on the batching core so the default install
//! exercises the same flush path as any production sink.

mod stdout;

pub use stdout::{JsonLinesFlush, StdoutDestination};
