//! Error types for CalDAV exchange operations.
//!
//! One variant per failure class, mirroring where in the pipeline the
//! failure occurred: model validation, configuration, transport, HTTP
//! status, multistatus decoding, or iCalendar block parsing.

use thiserror::Error;

use eventdav_core::ValidationError;

/// An error from a CalDAV exchange operation.
#[derive(Debug, Error)]
pub enum DavError {
    /// The event failed model validation before any network activity.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// The collection URL could not be used.
    #[error("invalid collection URL {url:?}: {reason}")]
    Config { url: String, reason: String },

    /// The HTTP exchange itself failed (connection, TLS, timeout).
    ///
    /// Propagated unchanged from the transport layer.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server answered with status {status}")]
    Protocol {
        /// The HTTP status code returned by the server.
        status: u16,
    },

    /// The multistatus response was not parsable XML.
    #[error("unreadable multistatus response: {0}")]
    Decode(String),

    /// An iCalendar block could not be parsed (strict mode only).
    #[error("unparsable event block {block}: {reason}")]
    Parse {
        /// Zero-based index of the offending block.
        block: usize,
        /// What went wrong inside the block.
        reason: String,
    },
}

impl DavError {
    /// Creates a configuration error for the given URL.
    pub fn config(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` for CalDAV exchange operations.
pub type DavResult<T> = Result<T, DavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DavError::config("not a url", "relative URL without a base");
        assert!(err.to_string().contains("not a url"));

        let err = DavError::Protocol { status: 403 };
        assert_eq!(err.to_string(), "server answered with status 403");

        let err = DavError::Parse {
            block: 2,
            reason: "missing UID".to_string(),
        };
        assert!(err.to_string().contains("block 2"));
        assert!(err.to_string().contains("missing UID"));
    }

    #[test]
    fn validation_error_converts() {
        let err: DavError = ValidationError::EmptyKey.into();
        assert!(matches!(err, DavError::Validation(_)));
    }
}
