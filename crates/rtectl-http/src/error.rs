//! Error types for the HTTP transports

use thiserror::Error;

/// HTTP transport errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Server could not be reached
    #[error("Failed to reach {url}: {message}")]
    Connection {
        /// Request URL
        url: String,
        /// Transport failure
        message: String,
    },

    /// Server answered with a non-success status
    #[error("{url} answered with HTTP {status}")]
    Status {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body could not be understood
    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse {
        /// Request URL
        url: String,
        /// Parse failure
        message: String,
    },

    /// API reported an error in an otherwise successful response
    #[error("API error: {0}")]
    Api(String),

    /// Client configuration is missing or invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HttpError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => HttpError::Status {
                url: url.to_string(),
                status,
            },
            ureq::Error::Transport(t) => HttpError::Connection {
                url: url.to_string(),
                message: t.to_string(),
            },
        }
    }

    pub(crate) fn invalid(url: &str, err: impl std::fmt::Display) -> Self {
        HttpError::InvalidResponse {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<HttpError> for rtectl_core::Error {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Connection { .. } => rtectl_core::Error::Transport(e.to_string()),
            _ => rtectl_core::Error::Rejected(e.to_string()),
        }
    }
}

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, HttpError>;
