//! XML request bodies and multistatus decoding for CalDAV operations.
//!
//! Request bodies (REPORT calendar-query, PROPFIND) are generated with
//! `quick_xml::Writer`. Responses are decoded with `quick_xml::NsReader`,
//! resolving elements by *(namespace URI, local name)* rather than by
//! literal prefix: real servers bind the DAV and CalDAV namespaces to
//! whatever prefixes they like (`D:`/`d:`, `C:`/`cal:`, or a default
//! namespace), and the decoder must not care.

use std::io::Cursor;

use quick_xml::{NsReader, Writer};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};

use eventdav_core::QueryWindow;

use crate::error::{DavError, DavResult};
use crate::ics::format_utc_stamp;

/// DAV namespace.
pub const DAV_NS: &str = "DAV:";
/// CalDAV namespace.
pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// A calendar collection returned by the folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    /// The collection's href (path on the server).
    pub href: String,
    /// The display name; empty when the server reported none.
    pub display_name: String,
}

/// Generates the REPORT body querying events overlapping a time window.
///
/// Requests only the `calendar-data` property, filtered by a
/// `VCALENDAR > VEVENT` component filter. The `time-range` always carries
/// a `start` attribute; `end` is present only for bounded windows — its
/// absence means "no upper bound", not a zero-length window.
pub fn calendar_query_body(window: &QueryWindow) -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .unwrap();

    let mut query = BytesStart::new("C:calendar-query");
    query.push_attribute(("xmlns:D", DAV_NS));
    query.push_attribute(("xmlns:C", CALDAV_NS));
    writer.write_event(Event::Start(query)).unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("D:prop")))
        .unwrap();
    writer
        .write_event(Event::Empty(BytesStart::new("C:calendar-data")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("D:prop")))
        .unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("C:filter")))
        .unwrap();

    let mut vcal_filter = BytesStart::new("C:comp-filter");
    vcal_filter.push_attribute(("name", "VCALENDAR"));
    writer.write_event(Event::Start(vcal_filter)).unwrap();

    let mut vevent_filter = BytesStart::new("C:comp-filter");
    vevent_filter.push_attribute(("name", "VEVENT"));
    writer.write_event(Event::Start(vevent_filter)).unwrap();

    let mut time_range = BytesStart::new("C:time-range");
    time_range.push_attribute(("start", format_utc_stamp(window.start).as_str()));
    if let Some(end) = window.end {
        time_range.push_attribute(("end", format_utc_stamp(end).as_str()));
    }
    writer.write_event(Event::Empty(time_range)).unwrap();

    writer
        .write_event(Event::End(BytesEnd::new("C:comp-filter")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("C:comp-filter")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("C:filter")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("C:calendar-query")))
        .unwrap();

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).unwrap()
}

/// Generates the PROPFIND body for the flat folder listing.
///
/// Requests only `displayname`.
pub fn propfind_displayname_body() -> String {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .unwrap();

    let mut propfind = BytesStart::new("D:propfind");
    propfind.push_attribute(("xmlns:D", DAV_NS));
    writer.write_event(Event::Start(propfind)).unwrap();

    writer
        .write_event(Event::Start(BytesStart::new("D:prop")))
        .unwrap();
    writer
        .write_event(Event::Empty(BytesStart::new("D:displayname")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("D:prop")))
        .unwrap();
    writer
        .write_event(Event::End(BytesEnd::new("D:propfind")))
        .unwrap();

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).unwrap()
}

/// The multistatus elements the decoders care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DavElement {
    Response,
    Propstat,
    Prop,
    CalendarData,
    Href,
    DisplayName,
    Other,
}

/// Classifies an element by namespace URI and local name.
///
/// Elements bound to the wrong namespace never match; elements with no
/// namespace binding at all (sloppy servers omitting the declarations)
/// fall back to matching on the local name alone.
fn classify(resolve: ResolveResult<'_>, local: &[u8]) -> DavElement {
    let (dav, caldav) = match resolve {
        ResolveResult::Bound(Namespace(ns)) => {
            (ns == DAV_NS.as_bytes(), ns == CALDAV_NS.as_bytes())
        }
        ResolveResult::Unbound => (true, true),
        ResolveResult::Unknown(_) => (false, false),
    };

    match local {
        b"response" if dav => DavElement::Response,
        b"propstat" if dav => DavElement::Propstat,
        b"prop" if dav => DavElement::Prop,
        b"href" if dav => DavElement::Href,
        b"displayname" if dav => DavElement::DisplayName,
        b"calendar-data" if caldav => DavElement::CalendarData,
        _ => DavElement::Other,
    }
}

/// Decodes a multistatus response into its embedded iCalendar blocks.
///
/// For each `response` element, takes the first
/// `propstat/prop/calendar-data` text node; responses without that path
/// (error-status propstats, property-less entries) contribute nothing.
/// Zero responses yield an empty list. The extracted text is returned
/// exactly as it appeared on the wire — no iCalendar parsing happens
/// here.
///
/// # Errors
///
/// Returns [`DavError::Decode`] when the XML itself is unparsable.
pub fn decode_multistatus(xml: &str) -> DavResult<Vec<String>> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut blocks = Vec::new();
    let mut in_response = false;
    let mut in_propstat = false;
    let mut in_prop = false;
    let mut taken_for_response = false;
    let mut collecting = false;
    let mut current = String::new();

    loop {
        match reader.read_resolved_event() {
            Ok((resolve, Event::Start(e))) => {
                match classify(resolve, e.local_name().as_ref()) {
                    DavElement::Response => {
                        in_response = true;
                        taken_for_response = false;
                    }
                    DavElement::Propstat if in_response => in_propstat = true,
                    DavElement::Prop if in_propstat => in_prop = true,
                    DavElement::CalendarData if in_prop && !taken_for_response => {
                        collecting = true;
                        current.clear();
                    }
                    _ => {}
                }
            }
            Ok((resolve, Event::End(e))) => match classify(resolve, e.local_name().as_ref()) {
                DavElement::Response => in_response = false,
                DavElement::Propstat => in_propstat = false,
                DavElement::Prop => in_prop = false,
                DavElement::CalendarData if collecting => {
                    collecting = false;
                    if !current.trim().is_empty() {
                        blocks.push(std::mem::take(&mut current));
                        taken_for_response = true;
                    }
                }
                _ => {}
            },
            Ok((_, Event::Text(e))) => {
                if collecting {
                    let text = e
                        .unescape()
                        .map_err(|err| DavError::Decode(err.to_string()))?;
                    current.push_str(&text);
                }
            }
            Ok((_, Event::CData(e))) => {
                if collecting {
                    current.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(DavError::Decode(e.to_string())),
        }
    }

    Ok(blocks)
}

/// Decodes a PROPFIND multistatus into `href`/`displayname` pairs.
///
/// Shares the namespace discipline of [`decode_multistatus`]. Responses
/// without an `href` contribute nothing; a missing `displayname` yields
/// an empty name rather than dropping the entry.
///
/// # Errors
///
/// Returns [`DavError::Decode`] when the XML itself is unparsable.
pub fn decode_calendar_listing(xml: &str) -> DavResult<Vec<CalendarRef>> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut calendars = Vec::new();
    let mut in_response = false;
    let mut current_text: Option<DavElement> = None;
    let mut href: Option<String> = None;
    let mut display_name: Option<String> = None;

    loop {
        match reader.read_resolved_event() {
            Ok((resolve, Event::Start(e))) => {
                match classify(resolve, e.local_name().as_ref()) {
                    DavElement::Response => {
                        in_response = true;
                        href = None;
                        display_name = None;
                    }
                    elem @ (DavElement::Href | DavElement::DisplayName) if in_response => {
                        current_text = Some(elem);
                    }
                    _ => {}
                }
            }
            Ok((resolve, Event::End(e))) => {
                match classify(resolve, e.local_name().as_ref()) {
                    DavElement::Response if in_response => {
                        if let Some(href) = href.take() {
                            calendars.push(CalendarRef {
                                href,
                                display_name: display_name.take().unwrap_or_default(),
                            });
                        }
                        in_response = false;
                    }
                    _ => {}
                }
                current_text = None;
            }
            Ok((_, Event::Text(e))) => {
                if let Some(elem) = current_text {
                    let text = e
                        .unescape()
                        .map_err(|err| DavError::Decode(err.to_string()))?;
                    match elem {
                        DavElement::Href => href = Some(text.into_owned()),
                        DavElement::DisplayName => display_name = Some(text.into_owned()),
                        _ => {}
                    }
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => return Err(DavError::Decode(e.to_string())),
        }
    }

    Ok(calendars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn query_body_with_bounded_window() {
        let window = QueryWindow::between(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap(),
        );
        let body = calendar_query_body(&window);

        assert!(body.contains("calendar-query"));
        assert!(body.contains("<C:calendar-data/>"));
        assert!(body.contains(r#"<C:comp-filter name="VCALENDAR">"#));
        assert!(body.contains(r#"<C:comp-filter name="VEVENT">"#));
        assert!(body.contains(r#"start="20240501T000000Z""#));
        assert!(body.contains(r#"end="20240531T235959Z""#));
    }

    #[test]
    fn query_body_with_open_window_omits_end() {
        let window = QueryWindow::since(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let body = calendar_query_body(&window);

        assert!(body.contains(r#"start="20240501T000000Z""#));
        assert!(!body.contains("end="));
    }

    #[test]
    fn propfind_body_requests_only_displayname() {
        let body = propfind_displayname_body();
        assert!(body.contains("propfind"));
        assert!(body.contains("<D:displayname/>"));
        assert!(!body.contains("resourcetype"));
    }

    fn multistatus_with_prefixes(dav: &str, caldav: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<{dav}:multistatus xmlns:{dav}="DAV:" xmlns:{caldav}="urn:ietf:params:xml:ns:caldav">
  <{dav}:response>
    <{dav}:href>/cal/user/abc1</{dav}:href>
    <{dav}:propstat>
      <{dav}:prop>
        <{caldav}:calendar-data>BEGIN:VCALENDAR
BEGIN:VEVENT
UID:abc1
SUMMARY:Standup
DTSTART:20240501T090000Z
DTEND:20240501T093000Z
END:VEVENT
END:VCALENDAR</{caldav}:calendar-data>
      </{dav}:prop>
      <{dav}:status>HTTP/1.1 200 OK</{dav}:status>
    </{dav}:propstat>
  </{dav}:response>
</{dav}:multistatus>"#
        )
    }

    #[test]
    fn decode_extracts_calendar_data() {
        let blocks = decode_multistatus(&multistatus_with_prefixes("D", "C")).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("BEGIN:VCALENDAR"));
        assert!(blocks[0].contains("SUMMARY:Standup"));
        assert!(blocks[0].ends_with("END:VCALENDAR"));
    }

    #[test]
    fn decode_is_prefix_agnostic() {
        let upper = decode_multistatus(&multistatus_with_prefixes("D", "C")).unwrap();
        let lower = decode_multistatus(&multistatus_with_prefixes("d", "cal")).unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn decode_accepts_default_namespace() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<multistatus xmlns="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <response>
    <propstat>
      <prop>
        <C:calendar-data>BEGIN:VCALENDAR
BEGIN:VEVENT
UID:abc1
SUMMARY:Standup
DTSTART:20240501T090000Z
DTEND:20240501T093000Z
END:VEVENT
END:VCALENDAR</C:calendar-data>
      </prop>
    </propstat>
  </response>
</multistatus>"#;
        let blocks = decode_multistatus(xml).unwrap();
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn decode_rejects_foreign_namespace() {
        // calendar-data bound to a non-CalDAV namespace is not ours.
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:example:other">
  <D:response>
    <D:propstat>
      <D:prop>
        <C:calendar-data>BEGIN:VCALENDAR
END:VCALENDAR</C:calendar-data>
      </D:prop>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let blocks = decode_multistatus(xml).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn decode_skips_responses_without_calendar_data() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/cal/user/gone</D:href>
    <D:propstat>
      <D:prop/>
      <D:status>HTTP/1.1 404 Not Found</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/user/abc1</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-data>BEGIN:VCALENDAR
BEGIN:VEVENT
UID:abc1
SUMMARY:Standup
DTSTART:20240501T090000Z
DTEND:20240501T093000Z
END:VEVENT
END:VCALENDAR</C:calendar-data>
      </D:prop>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let blocks = decode_multistatus(xml).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("UID:abc1"));
    }

    #[test]
    fn decode_empty_multistatus_yields_empty_list() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:"></D:multistatus>"#;
        let blocks = decode_multistatus(xml).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn decode_malformed_xml_is_an_error() {
        let err = decode_multistatus("<a><b></a></b>").unwrap_err();
        assert!(matches!(err, DavError::Decode(_)));
    }

    #[test]
    fn decode_handles_cdata_blocks() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:propstat>
      <D:prop>
        <C:calendar-data><![CDATA[BEGIN:VCALENDAR
BEGIN:VEVENT
UID:abc1
SUMMARY:A <b>bold</b> title
DTSTART:20240501T090000Z
DTEND:20240501T093000Z
END:VEVENT
END:VCALENDAR]]></C:calendar-data>
      </D:prop>
    </D:propstat>
  </D:response>
</D:multistatus>"#;
        let blocks = decode_multistatus(xml).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("A <b>bold</b> title"));
    }

    #[test]
    fn listing_pairs_href_with_displayname() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<d:multistatus xmlns:d="DAV:">
  <d:response>
    <d:href>/cal/user/work/</d:href>
    <d:propstat>
      <d:prop>
        <d:displayname>Work Calendar</d:displayname>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
  <d:response>
    <d:href>/cal/user/private/</d:href>
    <d:propstat>
      <d:prop/>
      <d:status>HTTP/1.1 404 Not Found</d:status>
    </d:propstat>
  </d:response>
</d:multistatus>"#;
        let calendars = decode_calendar_listing(xml).unwrap();
        assert_eq!(calendars.len(), 2);
        assert_eq!(calendars[0].href, "/cal/user/work/");
        assert_eq!(calendars[0].display_name, "Work Calendar");
        assert_eq!(calendars[1].href, "/cal/user/private/");
        assert_eq!(calendars[1].display_name, "");
    }

    #[test]
    fn listing_of_empty_multistatus_is_empty() {
        let xml = r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#;
        assert!(decode_calendar_listing(xml).unwrap().is_empty());
    }
}
