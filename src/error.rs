//! Error types for arxiv-harvest
//!
//! Upstream-induced failures (network, HTTP status, protocol, XML) are recovered
//! by the harvest loop and never reach the caller of a run. Local failures
//! (I/O, serialization, configuration) propagate.

use thiserror::Error;

/// Result type alias for arxiv-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for arxiv-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "retry.max_attempts")
        key: Option<String>,
    },

    /// Network error (timeout, connection refused, body read failure)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Upstream answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// Numeric HTTP status code
        status: u16,
        /// Request URL that produced the status
        url: String,
    },

    /// Response body could not be parsed as an OAI-PMH document
    #[error("malformed OAI-PMH response: {0}")]
    Xml(String),

    /// Upstream reported an OAI-PMH error other than `noRecordsMatch`
    #[error("OAI-PMH error {code}: {message}")]
    Protocol {
        /// OAI-PMH error code (e.g., "badResumptionToken")
        code: String,
        /// Error text reported by the repository
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}
