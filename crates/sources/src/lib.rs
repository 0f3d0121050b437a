//! Freight Sources - Log producers
//!
//! Source adapters that feed a Freight pipeline:
//!
//! - [`journald`] - tails the system journal through `journalctl`,
//!   persisting a resume cursor so a restart picks up exactly after the
//!   last acknowledged record
//! - [`windows`] - the Windows Event Log XML-to-JSON transcoder
//!
//! Per-record failures (a record that does not parse) are logged and
//! skipped; only transport-level failures terminate a source's run loop.

pub mod journald;
pub mod windows;
