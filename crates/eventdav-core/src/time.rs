//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or a bare calendar date), and
//! [`QueryWindow`] for defining the span a server query should cover.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event endpoint.
///
/// Calendar events can carry two kinds of times:
/// - **DateTime**: A specific point in time, stored as UTC
/// - **AllDay**: A calendar date without a time-of-day component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// A calendar date with no time-of-day (all-day events).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is a bare calendar date.
    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Returns the date if this is an `AllDay` variant.
    pub fn as_date(&self) -> Option<&NaiveDate> {
        match self {
            Self::AllDay(d) => Some(d),
            Self::DateTime(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// Bare dates are projected to midnight UTC.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns the date portion of this event time.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns `true` if the wall clock carries no time-of-day component.
    ///
    /// Bare dates qualify by definition; datetimes qualify when the UTC wall
    /// clock reads exactly midnight.
    pub fn is_midnight(&self) -> bool {
        match self {
            Self::AllDay(_) => true,
            Self::DateTime(dt) => {
                dt.time() == chrono::NaiveTime::from_hms_opt(0, 0, 0).expect("valid time")
            }
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// The span a calendar query should cover.
///
/// The lower bound is required; an absent upper bound means the query is
/// open-ended, not zero-length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive), or `None` for an unbounded query.
    pub end: Option<DateTime<Utc>>,
}

impl QueryWindow {
    /// Creates a bounded query window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "QueryWindow start must be <= end");
        Self {
            start,
            end: Some(end),
        }
    }

    /// Creates an open-ended query window starting at `start`.
    pub fn since(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    /// Creates a bounded window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::between(start, start + duration)
    }

    /// Returns `true` if the window has an upper bound.
    pub fn is_bounded(&self) -> bool {
        self.end.is_some()
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && self.end.is_none_or(|end| dt < end)
    }
}
