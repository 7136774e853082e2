//! Error types for the SSH session

use thiserror::Error;

/// SSH transport errors
#[derive(Debug, Error)]
pub enum SshError {
    /// TCP connection to the harness failed
    #[error("Failed to connect to {host}: {source}")]
    Connect {
        /// Host and port
        host: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Harness refused the credentials
    #[error("Authentication as '{user}' failed")]
    AuthFailed {
        /// User name
        user: String,
    },

    /// libssh2 failure
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    /// I/O failure on a channel or file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SshError> for rtectl_core::Error {
    fn from(e: SshError) -> Self {
        match e {
            SshError::AuthFailed { .. } => rtectl_core::Error::Rejected(e.to_string()),
            _ => rtectl_core::Error::Transport(e.to_string()),
        }
    }
}

/// Result type for SSH operations
pub type Result<T> = std::result::Result<T, SshError>;
