//! Freight Protocol - Core pipeline types
//!
//! The types that flow through every stage of a Freight pipeline:
//!
//! - [`Message`] - the immutable envelope carrying a value plus optional
//!   routing metadata
//! - [`Ack`] - the shared acknowledgment handle that fires an upstream
//!   callback exactly once after N confirmations
//! - [`Source`] / [`Destination`] - the traits every adapter implements
//! - [`Event`] - the normalized record produced by daemon sources
//!
//! # Data Flow
//!
//! ```text
//! [Source] ──(Message, AckFn)──> [Pipeline] ──> [Destination]
//!     ^                                              │
//!     └───────── ack fires on confirmed delivery ────┘
//! ```

mod ack;
mod error;
mod event;
mod message;
mod traits;

pub use ack::{Ack, AckFn};
pub use error::{is_cancelled, BoxError, Cancelled};
pub use event::Event;
pub use message::{Message, MsgAck};
pub use traits::{Destination, Source};
