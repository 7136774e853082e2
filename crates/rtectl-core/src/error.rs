//! Error types for rtectl-core
//!
//! Transport crates map their own failures into [`Error::Transport`] (the
//! remote end could not be reached) or [`Error::Rejected`] (the remote end
//! answered but refused). GPIO writes tolerate the former only.

use thiserror::Error;

use crate::gpio::{Pin, PinState};
use crate::power::PsuState;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    // GPIO errors
    /// GPIO number outside of the RTE range
    #[error("Wrong GPIO number: {0} (valid range is 0-19)")]
    InvalidPinNumber(u8),

    /// State not valid for the kind of pin
    #[error("Wrong GPIO state '{state}' for GPIO {pin}")]
    InvalidPinState {
        /// Pin the state was requested for
        pin: Pin,
        /// Rejected state
        state: PinState,
    },

    /// Unparsable GPIO state name
    #[error("Unknown GPIO state '{0}' (expected high, low or high-z)")]
    UnknownPinState(String),

    // Configuration errors
    /// Flash chip voltage the RTE cannot provide
    #[error("Wrong SPI voltage '{0}' (expected 1.8V or 3.3V)")]
    SpiWrongVoltage(String),

    /// No configuration file exists for the model
    #[error("The {0} model is not yet supported")]
    UnsupportedModel(String),

    /// Model configuration failed validation
    #[error("Model file '{model}' is invalid: {reason}")]
    InvalidModel {
        /// Model name
        model: String,
        /// Validation failure
        reason: String,
    },

    /// Flashing power state not understood
    #[error("Power state '{0}' is not supported. Please check model config.")]
    UnsupportedPowerState(String),

    /// Programmer name not understood
    #[error("Programmer '{0}' is not supported")]
    UnsupportedProgrammer(String),

    /// Model is powered by a Sonoff plug but no plug address is known
    #[error("Missing value for 'sonoff_ip' or Sonoff not found in the asset registry")]
    SonoffNotConfigured,

    // Hardware verification errors
    /// PSU did not reach the commanded state
    #[error("Failed to power control {expected}: PSU reports {actual}")]
    PsuStateMismatch {
        /// Commanded state
        expected: PsuState,
        /// State read back from the device
        actual: PsuState,
    },

    /// Device reported a power state we do not know
    #[error("Unexpected power state reported by device: '{0}'")]
    UnknownPsuState(String),

    // Transport errors
    /// Remote end could not be reached
    #[error("Connection failed: {0}")]
    Transport(String),

    /// Remote end refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),

    // Asset registry errors
    /// Asset is checked out by somebody else
    #[error("Asset {0} is checked out by another user")]
    AssetUnavailable(u64),

    /// Asset lookup failed
    #[error("No asset found for {0}")]
    AssetNotFound(String),

    // Image errors
    /// No FLVALSIG at either supported offset
    #[error("Invalid image, no FLVALSIG found")]
    InvalidDescriptor,

    /// Region name not in the descriptor region table
    #[error("Unknown flash region: \"{0}\"")]
    UnknownRegion(String),

    /// Region is marked unused in the descriptor
    #[error("Region \"{name}\" at index {index} is empty")]
    RegionEmpty {
        /// Region name
        name: String,
        /// Region table index
        index: usize,
    },

    /// Region extends past the end of the image
    #[error("Region \"{name}\" (0x{base:08x}-0x{limit:08x}) exceeds image size 0x{size:x}")]
    RegionOutOfBounds {
        /// Region name
        name: String,
        /// First byte
        base: usize,
        /// Last byte (inclusive)
        limit: usize,
        /// Image size
        size: usize,
    },

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a connection-class failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
