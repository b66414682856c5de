//! iCalendar serialization and wire-stamp codec.
//!
//! This module turns an [`Event`] into the `VCALENDAR`/`VEVENT` body sent
//! on PUT, and provides the stamp codec shared with the parser: the
//! `YYYYMMDD` / `YYYYMMDDTHHMMSSZ` date formats and the inclusive-vs-
//! exclusive end-date adjustment.
//!
//! DTSTART/DTEND are emitted in exactly one of three self-consistent
//! styles, applied to both properties:
//!
//! - all-day events: `DTSTART;TZID=<zone>:YYYYMMDD` (or bare
//!   `;VALUE=DATE` when no zone is stamped), end date exclusive;
//! - timed events whose endpoints both sit on a midnight/date-only wall
//!   clock: `DTSTART;VALUE=DATE:YYYYMMDD`, end date exclusive;
//! - all other timed events: `DTSTART:YYYYMMDDTHHMMSSZ`, no parameters.
//!
//! Summary, location and description text is emitted verbatim: no
//! RFC 5545 escaping of `:`/`;`/`,`/newlines is applied, preserving wire
//! compatibility with existing deployments that never escaped either.
//! Callers that need structural characters in those fields must escape
//! them upstream.

use chrono::{DateTime, Days, NaiveDate, Utc};

use eventdav_core::{Event, EventTime};

/// Formats a UTC datetime as a timed iCalendar stamp (`YYYYMMDDTHHMMSSZ`).
pub(crate) fn format_utc_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Formats a date as a whole-day iCalendar stamp (`YYYYMMDD`).
pub(crate) fn format_date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parses an iCalendar date or datetime stamp.
///
/// Accepts `YYYYMMDD` (whole-day), `YYYYMMDDTHHMMSSZ` (UTC) and
/// `YYYYMMDDTHHMMSS` (floating, normalized to UTC). Returns `None` for
/// anything else.
pub(crate) fn parse_stamp(value: &str) -> Option<EventTime> {
    let value = value.trim();

    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some(EventTime::from_date(date));
    }

    if let Some(naive) = value.strip_suffix('Z') {
        let dt = chrono::NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S").ok()?;
        return Some(EventTime::from_utc(dt.and_utc()));
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(EventTime::from_utc(dt.and_utc()));
    }

    None
}

/// Converts an inclusive in-memory end date to the exclusive wire form.
pub(crate) fn exclusive_end_date(end: NaiveDate) -> NaiveDate {
    end.checked_add_days(Days::new(1)).unwrap_or(end)
}

/// Converts an exclusive wire end date back to the inclusive form.
pub(crate) fn inclusive_end_date(end: NaiveDate) -> NaiveDate {
    end.checked_sub_days(Days::new(1)).unwrap_or(end)
}

/// Serializes an event into a `VCALENDAR` body holding a single `VEVENT`.
///
/// The output is deterministic for a given event; the text fields are
/// emitted verbatim (see the module docs for the escaping caveat).
pub fn serialize_event(event: &Event) -> String {
    let mut body = String::with_capacity(256);
    body.push_str("BEGIN:VCALENDAR\n");
    body.push_str("BEGIN:VEVENT\n");
    body.push_str("UID:");
    body.push_str(event.key());
    body.push('\n');

    if !event.location().is_empty() {
        body.push_str("LOCATION:");
        body.push_str(event.location());
        body.push('\n');
    }
    if !event.description().is_empty() {
        body.push_str("DESCRIPTION:");
        body.push_str(event.description());
        body.push('\n');
    }

    body.push_str("SUMMARY:");
    body.push_str(event.summary());
    body.push('\n');

    let (dtstart, dtend) = format_span(event);
    body.push_str(&dtstart);
    body.push('\n');
    body.push_str(&dtend);
    body.push('\n');

    body.push_str("END:VEVENT\n");
    body.push_str("END:VCALENDAR");
    body
}

/// Formats the DTSTART/DTEND property lines for an event.
fn format_span(event: &Event) -> (String, String) {
    let start_date = event.start().date();
    let end_date = exclusive_end_date(event.end().date());

    if event.is_all_day() {
        let params = match event.tzid() {
            Some(tzid) => format!(";TZID={tzid}"),
            None => ";VALUE=DATE".to_string(),
        };
        return (
            format!("DTSTART{params}:{}", format_date_stamp(start_date)),
            format!("DTEND{params}:{}", format_date_stamp(end_date)),
        );
    }

    // Timed events whose endpoints carry no time-of-day collapse to
    // whole-day stamps; anything else is a bare UTC timed stamp.
    if event.start().is_midnight() && event.end().is_midnight() {
        (
            format!("DTSTART;VALUE=DATE:{}", format_date_stamp(start_date)),
            format!("DTEND;VALUE=DATE:{}", format_date_stamp(end_date)),
        )
    } else {
        (
            format!(
                "DTSTART:{}",
                format_utc_stamp(event.start().to_utc_datetime())
            ),
            format!("DTEND:{}", format_utc_stamp(event.end().to_utc_datetime())),
        )
    }
}
