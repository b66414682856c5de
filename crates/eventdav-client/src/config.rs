//! Client configuration.
//!
//! [`CalDavConfig`] carries the collection URL and the knobs the transport
//! needs (credentials, TLS verification, timeout, user agent). The URL is
//! parsed and scheme-checked at construction so a malformed value fails
//! before any network activity.

use std::time::Duration;
use url::Url;

use crate::error::{DavError, DavResult};

/// Configuration for the CalDAV exchange client.
#[derive(Clone)]
pub struct CalDavConfig {
    /// The calendar collection URL (scheme, host, optional port, base path).
    url: Url,
    /// Username for Basic authentication.
    username: Option<String>,
    /// Password for Basic authentication.
    password: Option<String>,
    /// Whether to verify TLS certificates.
    verify_tls: bool,
    /// Request timeout.
    timeout: Duration,
    /// User agent string sent on every request.
    user_agent: String,
}

impl std::fmt::Debug for CalDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalDavConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl CalDavConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new configuration for the given collection URL.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Config`] if the URL does not parse or uses a
    /// scheme other than `http`/`https`.
    pub fn new(url: impl AsRef<str>) -> DavResult<Self> {
        let raw = url.as_ref();
        let parsed = Url::parse(raw).map_err(|e| DavError::config(raw, e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DavError::config(raw, format!("unsupported scheme {other:?}")));
            }
        }
        if parsed.host_str().is_none() {
            return Err(DavError::config(raw, "missing host"));
        }

        Ok(Self {
            url: parsed,
            username: None,
            password: None,
            verify_tls: true,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("eventdav/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the credentials for Basic authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the collection URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the collection URL as a string.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns true if credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Returns the configured credentials, if both parts are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Returns whether TLS certificates are verified.
    pub fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the user agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Builds the URL of the event resource named by `key`.
    ///
    /// The resource lives directly under the collection path.
    pub fn resource_url(&self, key: &str) -> String {
        format!("{}/{key}", self.url_str().trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_creation() {
        let config = CalDavConfig::new("https://caldav.example.com/calendars/user/").unwrap();
        assert_eq!(
            config.url_str(),
            "https://caldav.example.com/calendars/user/"
        );
        assert!(!config.has_credentials());
        assert!(config.verify_tls());
    }

    #[test]
    fn config_with_credentials() {
        let config = CalDavConfig::new("https://caldav.example.com/")
            .unwrap()
            .with_credentials("user", "pass");

        assert!(config.has_credentials());
        assert_eq!(config.credentials(), Some(("user", "pass")));
    }

    #[test]
    fn config_builder_methods() {
        let config = CalDavConfig::new("http://caldav.example.com:8008/cal/")
            .unwrap()
            .with_insecure_tls()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");

        assert!(!config.verify_tls());
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent(), "test-agent");
    }

    #[test]
    fn invalid_url_is_config_error() {
        let err = CalDavConfig::new("not a valid url").unwrap_err();
        assert!(matches!(err, DavError::Config { .. }));
    }

    #[test]
    fn non_http_scheme_rejected() {
        let err = CalDavConfig::new("ftp://caldav.example.com/cal/").unwrap_err();
        assert!(matches!(err, DavError::Config { .. }));
    }

    #[test]
    fn resource_url_appends_key() {
        let config = CalDavConfig::new("https://caldav.example.com/cal/user/").unwrap();
        assert_eq!(
            config.resource_url("abc1"),
            "https://caldav.example.com/cal/user/abc1"
        );

        // No trailing slash on the collection still yields a clean path.
        let config = CalDavConfig::new("https://caldav.example.com/cal/user").unwrap();
        assert_eq!(
            config.resource_url("abc1"),
            "https://caldav.example.com/cal/user/abc1"
        );
    }

    #[test]
    fn debug_redacts_password() {
        let config = CalDavConfig::new("https://caldav.example.com/")
            .unwrap()
            .with_credentials("user", "secret123");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret123"));
    }
}
