//! CalDAV event exchange client.
//!
//! This crate implements the encode/decode core that decides whether
//! calendar events round-trip correctly against a CalDAV server, plus the
//! thin HTTP layer that carries the bodies:
//!
//! - [`ics`] — Event → iCalendar `VEVENT` serialization and the shared
//!   wire-stamp codec (timed vs whole-day, inclusive vs exclusive ends)
//! - [`xml`] — REPORT/PROPFIND request bodies and namespace-tolerant
//!   multistatus decoding
//! - [`parser`] — iCalendar text → events, through either the `icalendar`
//!   grammar or a line-oriented fallback
//! - [`calendar`] — the operation-level API
//!   (`add_event`/`remove_event`/`get_events`/`list_calendars`)
//!
//! # Example
//!
//! ```ignore
//! use eventdav_client::{CalDavConfig, CalendarClient};
//! use eventdav_core::{Event, EventTime, QueryWindow};
//!
//! let config = CalDavConfig::new("https://caldav.example.com/cal/user/")?
//!     .with_credentials("user", "password");
//! let client = CalendarClient::new(config)?;
//!
//! let event = Event::new("abc1", "Standup", start, end)?;
//! client.add_event(&event).await?;
//!
//! let events = client.get_events(&QueryWindow::since(start)).await?;
//! ```

pub mod calendar;
pub mod client;
pub mod config;
pub mod error;
pub mod ics;
pub mod parser;
pub mod xml;

pub use calendar::CalendarClient;
pub use client::{DavResponse, DavTransport};
pub use config::CalDavConfig;
pub use error::{DavError, DavResult};
pub use ics::serialize_event;
pub use parser::{EventParser, ParserStrategy, RawVevent};
pub use xml::{
    CalendarRef, calendar_query_body, decode_calendar_listing, decode_multistatus,
    propfind_displayname_body,
};
