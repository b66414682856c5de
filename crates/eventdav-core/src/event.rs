//! The calendar event model.
//!
//! [`Event`] is the canonical structured representation of a calendar event
//! as it is exchanged with a server: a stable key, a title, an optional
//! location/description, and a start/end span that is either timed or
//! covers whole days. Events are validated on construction and never
//! mutated afterwards; an update is expressed as a new `Event` with the
//! same key.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::EventTime;

/// Characters that must not appear in an event key.
///
/// The key becomes the final segment of the resource URL, so anything that
/// would alter the path structure or require encoding is rejected outright.
const KEY_UNSAFE: &[char] = &['/', '\\', '?', '#', '%', '"', '<', '>'];

/// An error rejecting construction of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The event key was empty.
    #[error("event key must not be empty")]
    EmptyKey,

    /// The event key contained characters unsafe in a URL path segment.
    #[error("event key {0:?} contains characters unsafe in a resource path")]
    UnsafeKey(String),

    /// The event summary was empty.
    #[error("event summary must not be empty")]
    EmptySummary,

    /// The event end predates its start.
    #[error("event end predates its start")]
    EndBeforeStart,
}

/// A calendar event.
///
/// The span is inclusive on both sides: an all-day event covering the 1st
/// and the 2nd has `end` on the 2nd. The wire format's exclusive end-date
/// convention is handled by the transcoder, not the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    key: String,
    summary: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    start: EventTime,
    end: EventTime,
    all_day: bool,
    tzid: Option<String>,
}

impl Event {
    /// Creates a new event, validating the model invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if `key` or `summary` is empty, if
    /// `key` contains path-unsafe characters, or if `end` is earlier than
    /// `start`.
    pub fn new(
        key: impl Into<String>,
        summary: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Result<Self, ValidationError> {
        let key = key.into();
        let summary = summary.into();

        if key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        if key
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || KEY_UNSAFE.contains(&c))
        {
            return Err(ValidationError::UnsafeKey(key));
        }
        if summary.is_empty() {
            return Err(ValidationError::EmptySummary);
        }
        if end < start {
            return Err(ValidationError::EndBeforeStart);
        }

        Ok(Self {
            key,
            summary,
            location: String::new(),
            description: String::new(),
            start,
            end,
            all_day: false,
            tzid: None,
        })
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method marking this as an all-day event in the named zone.
    ///
    /// The zone identifier is stamped onto the wire form's DTSTART/DTEND.
    pub fn all_day_in(mut self, tzid: impl Into<String>) -> Self {
        self.all_day = true;
        self.tzid = Some(tzid.into());
        self
    }

    /// Builder method marking this as an all-day event without a zone.
    ///
    /// The wire form falls back to bare `VALUE=DATE` stamps.
    pub fn all_day(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// The unique identifier (iCalendar UID, resource path segment).
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The event title (iCalendar SUMMARY).
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// The event location; empty when unset.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The event description; empty when unset.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// When the event starts.
    pub fn start(&self) -> &EventTime {
        &self.start
    }

    /// When the event ends (inclusive).
    pub fn end(&self) -> &EventTime {
        &self.end
    }

    /// Whether the event occupies whole days with no time-of-day.
    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    /// The named time zone for all-day events, if stamped.
    pub fn tzid(&self) -> Option<&str> {
        self.tzid.as_deref()
    }
}
