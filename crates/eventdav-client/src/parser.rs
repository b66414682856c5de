//! iCalendar parsing: text blocks in, events out.
//!
//! Two interchangeable strategies produce the same intermediate record:
//!
//! - [`ParserStrategy::Grammar`] delegates to the `icalendar` crate's
//!   component tree and reads each VEVENT's properties from it;
//! - [`ParserStrategy::LineOriented`] is a self-contained fallback that
//!   scans `BEGIN:VEVENT`…`END:VEVENT` spans line by line, unfolding
//!   continuation lines and splitting on the first `:`. It does not
//!   decompose parameter lists — `DTSTART;VALUE=DATE` stays a single key
//!   token, and the conversion layer special-cases such composite keys.
//!
//! The shared conversion turns a [`RawVevent`] into an [`Event`]: the
//! stamp shape decides between whole-day and timed forms, a whole-day
//! DTEND loses one calendar day to restore the inclusive in-memory end,
//! and the DTSTART TZID parameter is carried over. A block that cannot be
//! converted (missing UID, malformed date) is skipped in batch mode and
//! aborts with the block index in strict mode.

use icalendar::{Calendar, CalendarComponent, Component};
use serde::{Deserialize, Serialize};
use tracing::warn;

use eventdav_core::{Event, EventTime};

use crate::error::{DavError, DavResult};
use crate::ics::{inclusive_end_date, parse_stamp};

/// How iCalendar text is turned into structured records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParserStrategy {
    /// Parse through the `icalendar` grammar and walk the component tree.
    #[default]
    Grammar,
    /// Scan the text line by line without a grammar.
    LineOriented,
}

/// A structured-but-unconverted VEVENT, one entry per content line.
///
/// Keys are kept exactly as they appear on the wire, parameters included:
/// a property written `DTSTART;VALUE=DATE:20240501` is stored under the
/// key `DTSTART;VALUE=DATE`. Lookups match on the property name before
/// the first `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVevent {
    properties: Vec<(String, String)>,
}

impl RawVevent {
    /// All properties in the order they were collected.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Returns the value of the first property with the given name,
    /// ignoring any parameters in the stored key.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.keyed(name).map(|(_, value)| value)
    }

    /// Returns the full key token and value of the first property with
    /// the given name.
    pub fn keyed(&self, name: &str) -> Option<(&str, &str)> {
        self.properties
            .iter()
            .find(|(key, _)| key_name(key).eq_ignore_ascii_case(name))
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// The property name of a key token (the part before any parameters).
fn key_name(key: &str) -> &str {
    key.split(';').next().unwrap_or(key)
}

/// Looks up a parameter inside a composite key token.
///
/// `key_param("DTSTART;TZID=Europe/Berlin", "TZID")` yields
/// `Some("Europe/Berlin")`.
fn key_param<'a>(key: &'a str, param: &str) -> Option<&'a str> {
    key.split(';').skip(1).find_map(|token| {
        let (name, value) = token.split_once('=')?;
        name.eq_ignore_ascii_case(param).then_some(value)
    })
}

/// Parses iCalendar text into events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventParser {
    strategy: ParserStrategy,
}

impl EventParser {
    /// Creates a parser using the given strategy.
    pub fn new(strategy: ParserStrategy) -> Self {
        Self { strategy }
    }

    /// Returns the configured strategy.
    pub fn strategy(&self) -> ParserStrategy {
        self.strategy
    }

    /// Parses the text into raw records, one per VEVENT.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Parse`] when the grammar strategy cannot read
    /// the text at all. The line-oriented strategy has no such failure
    /// mode — unrecognizable text simply yields no records.
    pub fn parse_raw(&self, ics: &str) -> DavResult<Vec<RawVevent>> {
        self.scan(ics)
            .map_err(|reason| DavError::Parse { block: 0, reason })
    }

    /// Parses the text into events, skipping blocks that fail.
    ///
    /// Per-block failures (missing UID, malformed dates) are logged and
    /// skipped so one bad event does not discard the batch.
    pub fn parse_events(&self, ics: &str) -> Vec<Event> {
        let raws = match self.scan(ics) {
            Ok(raws) => raws,
            Err(reason) => {
                warn!(%reason, "failed to parse iCalendar text");
                return Vec::new();
            }
        };

        raws.iter()
            .enumerate()
            .filter_map(|(block, raw)| match convert(raw) {
                Ok(event) => Some(event),
                Err(reason) => {
                    warn!(block, %reason, "skipping unparsable event block");
                    None
                }
            })
            .collect()
    }

    /// Parses the text into events, aborting on the first bad block.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Parse`] naming the zero-based index of the
    /// offending block.
    pub fn parse_events_strict(&self, ics: &str) -> DavResult<Vec<Event>> {
        let raws = self
            .scan(ics)
            .map_err(|reason| DavError::Parse { block: 0, reason })?;

        raws.iter()
            .enumerate()
            .map(|(block, raw)| convert(raw).map_err(|reason| DavError::Parse { block, reason }))
            .collect()
    }

    /// Runs the configured scanning strategy.
    fn scan(&self, ics: &str) -> Result<Vec<RawVevent>, String> {
        match self.strategy {
            ParserStrategy::Grammar => scan_grammar(ics),
            ParserStrategy::LineOriented => Ok(scan_line_oriented(ics)),
        }
    }
}

/// Grammar strategy: parse the component tree and flatten each VEVENT's
/// properties back into wire-shaped key tokens.
fn scan_grammar(ics: &str) -> Result<Vec<RawVevent>, String> {
    let calendar: Calendar = ics.parse()?;

    let mut events = Vec::new();
    for component in calendar.iter() {
        let CalendarComponent::Event(event) = component else {
            continue;
        };

        let mut properties = Vec::new();
        for (name, property) in event.properties() {
            let mut key = name.clone();
            // Parameters live in a map; sort them so the reconstructed
            // key token is deterministic.
            let mut params: Vec<_> = property.params().values().collect();
            params.sort_by(|a, b| a.key().cmp(b.key()));
            for param in params {
                key.push(';');
                key.push_str(param.key());
                key.push('=');
                key.push_str(param.value());
            }
            properties.push((key, property.value().to_string()));
        }
        events.push(RawVevent { properties });
    }

    Ok(events)
}

/// Line-oriented strategy: unfold, then collect `KEY:VALUE` lines between
/// the VEVENT markers. Marker lines of nested components are skipped.
fn scan_line_oriented(ics: &str) -> Vec<RawVevent> {
    let mut events = Vec::new();
    let mut current: Option<Vec<(String, String)>> = None;

    for line in unfold_lines(ics) {
        let line = line.trim_end();
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(Vec::new());
            continue;
        }
        if line.eq_ignore_ascii_case("END:VEVENT") {
            if let Some(properties) = current.take() {
                events.push(RawVevent { properties });
            }
            continue;
        }

        let Some(properties) = current.as_mut() else {
            continue;
        };
        let upper = line.to_ascii_uppercase();
        if upper.starts_with("BEGIN:") || upper.starts_with("END:") {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            properties.push((key.to_string(), value.to_string()));
        }
    }

    events
}

/// Unfolds continuation lines (a line starting with a space or tab
/// continues the previous one).
fn unfold_lines(data: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for line in data.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&line[1..]);
            }
        } else if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    lines
}

/// Converts a raw record into an [`Event`].
///
/// An event is all-day exactly when its DTSTART is a whole-day stamp —
/// either bare `VALUE=DATE` or a TZID-qualified date. Timed stamps with a
/// TZID parameter are treated as UTC wall clocks; zone resolution is out
/// of scope here.
fn convert(raw: &RawVevent) -> Result<Event, String> {
    let key = raw.value_of("UID").ok_or("missing UID")?;
    let summary = raw.value_of("SUMMARY").unwrap_or_default();

    let (start_key, start_value) = raw.keyed("DTSTART").ok_or("missing DTSTART")?;
    let start = parse_stamp(start_value)
        .ok_or_else(|| format!("unrecognized DTSTART value {start_value:?}"))?;

    let end = match raw.keyed("DTEND") {
        Some((_, value)) => {
            parse_stamp(value).ok_or_else(|| format!("unrecognized DTEND value {value:?}"))?
        }
        None => start.clone(),
    };

    // Whole-day DTEND stamps are exclusive on the wire; bring them back
    // to the inclusive in-memory convention.
    let end = match end {
        EventTime::AllDay(date) => EventTime::AllDay(inclusive_end_date(date)),
        timed => timed,
    };

    let mut event = Event::new(key, summary, start.clone(), end).map_err(|e| e.to_string())?;

    if start.is_date_only() {
        event = match key_param(start_key, "TZID") {
            Some(tzid) => event.all_day_in(tzid),
            None => event.all_day(),
        };
    }
    if let Some(location) = raw.value_of("LOCATION") {
        event = event.with_location(location);
    }
    if let Some(description) = raw.value_of("DESCRIPTION") {
        event = event.with_description(description);
    }

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::serialize_event;
    use chrono::{NaiveDate, TimeZone, Utc};

    const TIMED_ICS: &str = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:abc1\n\
LOCATION:Room 4\n\
DESCRIPTION:Daily sync\n\
SUMMARY:Standup\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
END:VCALENDAR";

    const ALL_DAY_ICS: &str = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:hol-1\n\
SUMMARY:Offsite\n\
DTSTART;TZID=Europe/Berlin:20240501\n\
DTEND;TZID=Europe/Berlin:20240503\n\
END:VEVENT\n\
END:VCALENDAR";

    fn both_strategies() -> [EventParser; 2] {
        [
            EventParser::new(ParserStrategy::Grammar),
            EventParser::new(ParserStrategy::LineOriented),
        ]
    }

    #[test]
    fn parses_timed_event() {
        for parser in both_strategies() {
            let events = parser.parse_events(TIMED_ICS);
            assert_eq!(events.len(), 1, "{:?}", parser.strategy());

            let event = &events[0];
            assert_eq!(event.key(), "abc1");
            assert_eq!(event.summary(), "Standup");
            assert_eq!(event.location(), "Room 4");
            assert_eq!(event.description(), "Daily sync");
            assert!(!event.is_all_day());
            assert_eq!(
                event.start(),
                &EventTime::from_utc(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap())
            );
            assert_eq!(
                event.end(),
                &EventTime::from_utc(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap())
            );
        }
    }

    #[test]
    fn parses_all_day_event_with_tzid() {
        for parser in both_strategies() {
            let events = parser.parse_events(ALL_DAY_ICS);
            assert_eq!(events.len(), 1, "{:?}", parser.strategy());

            let event = &events[0];
            assert!(event.is_all_day());
            assert_eq!(event.tzid(), Some("Europe/Berlin"));
            assert_eq!(
                event.start(),
                &EventTime::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            );
            // Exclusive wire end 2024-05-03 comes back as inclusive 2024-05-02.
            assert_eq!(
                event.end(),
                &EventTime::from_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
            );
        }
    }

    #[test]
    fn parses_bare_value_date_as_all_day() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:hol-2\n\
SUMMARY:Holiday\n\
DTSTART;VALUE=DATE:20240501\n\
DTEND;VALUE=DATE:20240502\n\
END:VEVENT\n\
END:VCALENDAR";
        for parser in both_strategies() {
            let events = parser.parse_events(ics);
            assert_eq!(events.len(), 1);
            assert!(events[0].is_all_day());
            assert!(events[0].tzid().is_none());
            assert_eq!(
                events[0].end(),
                &EventTime::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            );
        }
    }

    #[test]
    fn parses_multiple_vevents_per_block() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:one\n\
SUMMARY:First\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T100000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
UID:two\n\
SUMMARY:Second\n\
DTSTART:20240502T090000Z\n\
DTEND:20240502T100000Z\n\
END:VEVENT\n\
END:VCALENDAR";
        for parser in both_strategies() {
            let events = parser.parse_events(ics);
            assert_eq!(events.len(), 2, "{:?}", parser.strategy());
            assert_eq!(events[0].key(), "one");
            assert_eq!(events[1].key(), "two");
        }
    }

    #[test]
    fn missing_dtend_falls_back_to_start() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:ping\n\
SUMMARY:Ping\n\
DTSTART:20240501T090000Z\n\
END:VEVENT\n\
END:VCALENDAR";
        for parser in both_strategies() {
            let events = parser.parse_events(ics);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].start(), events[0].end());
        }
    }

    #[test]
    fn folded_lines_are_unfolded() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:fold-1\n\
SUMMARY:A rather long\n  meeting title\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
END:VCALENDAR";
        let parser = EventParser::new(ParserStrategy::LineOriented);
        let events = parser.parse_events(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary(), "A rather long meeting title");
    }

    #[test]
    fn bad_block_is_skipped_in_batch_mode() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:good-1\n\
SUMMARY:Fine\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
UID:bad-1\n\
SUMMARY:Broken\n\
DTSTART:not-a-date\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
END:VCALENDAR";
        let parser = EventParser::new(ParserStrategy::LineOriented);
        let events = parser.parse_events(ics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key(), "good-1");
    }

    #[test]
    fn strict_mode_names_the_offending_block() {
        let ics = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:good-1\n\
SUMMARY:Fine\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:No uid here\n\
DTSTART:20240501T090000Z\n\
DTEND:20240501T093000Z\n\
END:VEVENT\n\
END:VCALENDAR";
        let parser = EventParser::new(ParserStrategy::LineOriented);
        let err = parser.parse_events_strict(ics).unwrap_err();
        match err {
            DavError::Parse { block, reason } => {
                assert_eq!(block, 1);
                assert!(reason.contains("UID"));
            }
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn raw_mode_preserves_composite_keys() {
        let parser = EventParser::new(ParserStrategy::LineOriented);
        let raws = parser.parse_raw(ALL_DAY_ICS).unwrap();
        assert_eq!(raws.len(), 1);

        let raw = &raws[0];
        let (key, value) = raw.keyed("DTSTART").unwrap();
        assert_eq!(key, "DTSTART;TZID=Europe/Berlin");
        assert_eq!(value, "20240501");
        assert_eq!(raw.value_of("UID"), Some("hol-1"));
        // Marker lines never land in the property list.
        assert!(raw.value_of("BEGIN").is_none());
    }

    #[test]
    fn empty_text_yields_no_events() {
        let parser = EventParser::new(ParserStrategy::LineOriented);
        assert!(parser.parse_events("").is_empty());
        assert!(parser.parse_raw("").unwrap().is_empty());
    }

    #[test]
    fn key_param_lookup() {
        assert_eq!(
            key_param("DTSTART;TZID=Europe/Berlin", "TZID"),
            Some("Europe/Berlin")
        );
        assert_eq!(key_param("DTSTART;VALUE=DATE", "TZID"), None);
        assert_eq!(key_param("DTSTART", "TZID"), None);
        assert_eq!(
            key_param("DTSTART;VALUE=DATE;TZID=UTC", "TZID"),
            Some("UTC")
        );
    }

    #[test]
    fn timed_roundtrip() {
        let original = Event::new(
            "abc1",
            "Standup",
            EventTime::from_utc(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            EventTime::from_utc(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()),
        )
        .unwrap()
        .with_location("Room 4");

        let body = serialize_event(&original);
        for parser in both_strategies() {
            let events = parser.parse_events(&body);
            assert_eq!(events.len(), 1, "{:?}", parser.strategy());

            let parsed = &events[0];
            assert_eq!(parsed.key(), original.key());
            assert_eq!(parsed.summary(), original.summary());
            assert_eq!(parsed.location(), original.location());
            assert_eq!(parsed.start(), original.start());
            assert_eq!(parsed.end(), original.end());
        }
    }

    #[test]
    fn all_day_roundtrip_restores_inclusive_end() {
        let original = Event::new(
            "hol-1",
            "Offsite",
            EventTime::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            EventTime::from_date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()),
        )
        .unwrap()
        .all_day_in("Europe/Berlin");

        let body = serialize_event(&original);
        assert!(body.contains("DTEND;TZID=Europe/Berlin:20240503"));

        for parser in both_strategies() {
            let events = parser.parse_events(&body);
            assert_eq!(events.len(), 1, "{:?}", parser.strategy());

            let parsed = &events[0];
            assert_eq!(parsed.key(), original.key());
            assert!(parsed.is_all_day());
            assert_eq!(parsed.tzid(), Some("Europe/Berlin"));
            assert_eq!(parsed.start(), original.start());
            assert_eq!(parsed.end(), original.end());
        }
    }
}
