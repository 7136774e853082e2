//! rtectl-ssh - SSH transport for rtectl
//!
//! Implements [`rtectl_core::flash::Connector`] on top of libssh2: password
//! authentication against the harness, SFTP for image transfer and a polled
//! exec channel for flashrom output.

#![warn(missing_docs)]

pub mod error;
mod session;

pub use error::{Result, SshError};
pub use session::{
    SshChannel, SshConnector, SshSession, DEFAULT_PASSWORD, DEFAULT_USER, SSH_PORT,
};
