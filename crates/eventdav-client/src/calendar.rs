//! Operation-level CalDAV client.
//!
//! [`CalendarClient`] glues the pipeline together: serialize or build a
//! request body, run one HTTP exchange through the transport, and decode
//! or parse whatever comes back. Mutations succeed on any 2xx status and
//! fail with the server's status otherwise; queries decode the
//! multistatus envelope and parse each embedded iCalendar block,
//! isolating per-block parse failures so one malformed event does not
//! discard the rest. Nothing is retried.

use tracing::{debug, info, warn};

use eventdav_core::{Event, QueryWindow};

use crate::client::{DavResponse, DavTransport};
use crate::config::CalDavConfig;
use crate::error::{DavError, DavResult};
use crate::ics::serialize_event;
use crate::parser::{EventParser, RawVevent};
use crate::xml::{
    CalendarRef, calendar_query_body, decode_calendar_listing, decode_multistatus,
    propfind_displayname_body,
};

/// A client for one calendar collection on a CalDAV server.
pub struct CalendarClient {
    transport: DavTransport,
    parser: EventParser,
}

impl CalendarClient {
    /// Creates a client for the collection named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Transport`] if the HTTP client cannot be built.
    /// A malformed collection URL has already failed as
    /// [`DavError::Config`] during [`CalDavConfig::new`].
    pub fn new(config: CalDavConfig) -> DavResult<Self> {
        Ok(Self {
            transport: DavTransport::new(config)?,
            parser: EventParser::default(),
        })
    }

    /// Replaces the iCalendar parser (e.g. to select the line-oriented
    /// fallback strategy).
    pub fn with_parser(mut self, parser: EventParser) -> Self {
        self.parser = parser;
        self
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &CalDavConfig {
        self.transport.config()
    }

    /// Creates or replaces an event on the server.
    ///
    /// The event is serialized to iCalendar and PUT to
    /// `<collection>/<key>`.
    ///
    /// # Errors
    ///
    /// [`DavError::Transport`] on connection failure,
    /// [`DavError::Protocol`] on any non-2xx status.
    pub async fn add_event(&self, event: &Event) -> DavResult<()> {
        let url = self.config().resource_url(event.key());
        let body = serialize_event(event);

        debug!(key = %event.key(), url = %url, "putting event");

        let response = self.transport.put_calendar(&url, body).await?;
        expect_success(response)?;

        info!(key = %event.key(), "event stored");
        Ok(())
    }

    /// Deletes an event from the server.
    ///
    /// # Errors
    ///
    /// [`DavError::Transport`] on connection failure,
    /// [`DavError::Protocol`] on any non-2xx status.
    pub async fn remove_event(&self, event: &Event) -> DavResult<()> {
        let url = self.config().resource_url(event.key());

        debug!(key = %event.key(), url = %url, "deleting event");

        let response = self.transport.delete(&url).await?;
        expect_success(response)?;

        info!(key = %event.key(), "event removed");
        Ok(())
    }

    /// Fetches the events overlapping a time window.
    ///
    /// Blocks that fail to parse are logged and skipped; an empty result
    /// is a valid outcome, not an error.
    ///
    /// # Errors
    ///
    /// [`DavError::Transport`] on connection failure,
    /// [`DavError::Protocol`] on a non-2xx status,
    /// [`DavError::Decode`] when the multistatus XML is unparsable.
    pub async fn get_events(&self, window: &QueryWindow) -> DavResult<Vec<Event>> {
        let blocks = self.query_blocks(window).await?;

        let mut events = Vec::new();
        for (index, ics) in blocks.iter().enumerate() {
            let mut parsed = self.parser.parse_events(ics);
            if parsed.is_empty() && !ics.trim().is_empty() {
                warn!(block = index, "calendar-data block yielded no events");
            }
            events.append(&mut parsed);
        }

        info!(count = events.len(), "fetched events");
        Ok(events)
    }

    /// Fetches the raw, unconverted event records overlapping a window.
    ///
    /// Callers wanting full fidelity to the wire object get one
    /// [`RawVevent`] per VEVENT; blocks the parser cannot read at all are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Same failure classes as [`Self::get_events`].
    pub async fn get_events_raw(&self, window: &QueryWindow) -> DavResult<Vec<RawVevent>> {
        let blocks = self.query_blocks(window).await?;

        let mut raws = Vec::new();
        for (index, ics) in blocks.iter().enumerate() {
            match self.parser.parse_raw(ics) {
                Ok(mut parsed) => raws.append(&mut parsed),
                Err(error) => {
                    warn!(block = index, %error, "skipping unreadable calendar-data block");
                }
            }
        }

        Ok(raws)
    }

    /// Lists the collections under the configured URL.
    ///
    /// # Errors
    ///
    /// [`DavError::Transport`] on connection failure,
    /// [`DavError::Protocol`] on a non-2xx status,
    /// [`DavError::Decode`] when the multistatus XML is unparsable.
    pub async fn list_calendars(&self) -> DavResult<Vec<CalendarRef>> {
        let url = self.config().url_str().to_string();
        let body = propfind_displayname_body();

        debug!(url = %url, "listing calendars");

        let response = self.transport.propfind(&url, body).await?;
        let response = expect_success(response)?;

        decode_calendar_listing(&response.body)
    }

    /// Issues the REPORT and decodes the multistatus into ICS blocks.
    async fn query_blocks(&self, window: &QueryWindow) -> DavResult<Vec<String>> {
        let url = self.config().url_str().to_string();
        let body = calendar_query_body(window);

        debug!(url = %url, start = %window.start, "querying events");

        let response = self.transport.report(&url, body).await?;
        let response = expect_success(response)?;

        let blocks = decode_multistatus(&response.body)?;
        debug!(count = blocks.len(), "decoded calendar-data blocks");
        Ok(blocks)
    }
}

/// Maps a non-2xx response to [`DavError::Protocol`].
fn expect_success(response: DavResponse) -> DavResult<DavResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(DavError::Protocol {
            status: response.status,
        })
    }
}
