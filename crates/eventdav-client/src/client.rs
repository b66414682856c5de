//! HTTP transport for CalDAV operations.
//!
//! A thin wrapper around `reqwest` that knows the four methods the
//! protocol needs (PUT, DELETE, REPORT, PROPFIND), attaches the Basic
//! Authorization header when credentials are configured, and hands the
//! status plus body back to the operation layer unjudged — whether a
//! status is acceptable depends on the operation, not the transport.
//!
//! Each exchange owns its response buffer for exactly the lifetime of the
//! call; no state is shared between requests, and nothing is retried.

use base64::Engine;
use reqwest::{Client, Method};
use tracing::trace;

use crate::config::CalDavConfig;
use crate::error::DavResult;

/// Media type of iCalendar bodies (PUT).
const CONTENT_TYPE_CALENDAR: &str = "text/calendar; charset=utf-8";
/// Media type of XML bodies (REPORT, PROPFIND).
const CONTENT_TYPE_XML: &str = "text/xml; charset=utf-8";

/// The outcome of a single HTTP exchange.
#[derive(Debug)]
pub struct DavResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body, decoded as text.
    pub body: String,
}

impl DavResponse {
    /// Returns true for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport for CalDAV exchanges.
pub struct DavTransport {
    http: Client,
    config: CalDavConfig,
}

impl DavTransport {
    /// Creates a transport from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DavError::Transport`] if the HTTP client cannot be
    /// constructed (e.g. no TLS backend available).
    pub fn new(config: CalDavConfig) -> DavResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls())
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self { http, config })
    }

    /// Returns the transport's configuration.
    pub fn config(&self) -> &CalDavConfig {
        &self.config
    }

    /// Performs a PUT of an iCalendar body.
    pub async fn put_calendar(&self, url: &str, body: String) -> DavResult<DavResponse> {
        self.send(Method::PUT, url, Some((CONTENT_TYPE_CALENDAR, body)), None)
            .await
    }

    /// Performs a DELETE of an event resource.
    pub async fn delete(&self, url: &str) -> DavResult<DavResponse> {
        self.send(Method::DELETE, url, None, None).await
    }

    /// Performs a REPORT carrying a calendar-query body.
    pub async fn report(&self, url: &str, body: String) -> DavResult<DavResponse> {
        let method = Method::from_bytes(b"REPORT").unwrap_or(Method::GET);
        self.send(method, url, Some((CONTENT_TYPE_XML, body)), Some("1"))
            .await
    }

    /// Performs a PROPFIND carrying a property-request body.
    pub async fn propfind(&self, url: &str, body: String) -> DavResult<DavResponse> {
        let method = Method::from_bytes(b"PROPFIND").unwrap_or(Method::GET);
        self.send(method, url, Some((CONTENT_TYPE_XML, body)), Some("1"))
            .await
    }

    /// Performs a single HTTP exchange.
    ///
    /// `Content-Length` is derived by reqwest from the UTF-8 byte length of
    /// the body, which keeps it accurate for multi-byte text.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<(&str, String)>,
        depth: Option<&str>,
    ) -> DavResult<DavResponse> {
        let mut request = self.http.request(method.clone(), url);

        if let Some(d) = depth {
            request = request.header("Depth", d);
        }
        if let Some((user, pass)) = self.config.credentials() {
            request = request.header("Authorization", basic_auth(user, pass));
        }
        if let Some((content_type, body)) = body {
            request = request.header("Content-Type", content_type).body(body);
        }

        trace!(method = %method, url = %url, "sending request");

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        trace!(status, body_len = body.len(), "received response");

        Ok(DavResponse { status, body })
    }
}

/// Generates a Basic Authorization header value (RFC 7617).
fn basic_auth(username: &str, password: &str) -> String {
    let credentials = format!("{username}:{password}");
    let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
    format!("Basic {encoded}")
}
