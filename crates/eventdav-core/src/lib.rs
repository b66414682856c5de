//! Core types for the eventdav calendar exchange client.
//!
//! This crate is pure data: the [`Event`] model with its construction-time
//! validation, the [`EventTime`]/[`QueryWindow`] time types, and the shared
//! tracing bootstrap. All wire-format concerns (iCalendar, CalDAV XML,
//! HTTP) live in `eventdav-client`.

pub mod event;
pub mod time;
pub mod tracing;

pub use event::{Event, ValidationError};
pub use time::{EventTime, QueryWindow};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
