//! GPIO pin and state types

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Lowest valid GPIO number
pub const GPIO_MIN: u8 = 0;
/// Highest valid GPIO number
pub const GPIO_MAX: u8 = 19;

/// Electrical kind of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Push-pull output, states "high" and "low"
    Regular,
    /// Open-collector output, states "low" and "high-z"
    OpenCollector,
}

/// Semantic state of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    /// Driven high (regular pins only)
    High,
    /// Driven or pulled low
    Low,
    /// Released (open-collector pins only)
    HighZ,
}

impl PinState {
    /// Name used on the command line and by the RTE documentation
    pub fn as_str(self) -> &'static str {
        match self {
            PinState::High => "high",
            PinState::Low => "low",
            PinState::HighZ => "high-z",
        }
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PinState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(PinState::High),
            "low" => Ok(PinState::Low),
            "high-z" => Ok(PinState::HighZ),
            other => Err(Error::UnknownPinState(other.to_string())),
        }
    }
}

/// A validated GPIO number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pin(u8);

impl Pin {
    /// PSU relay
    pub const RELAY: Pin = Pin(0);
    /// SPI lines enable (active low)
    pub const SPI_ON: Pin = Pin(1);
    /// SPI voltage select: low selects 3.3V, high-z selects 1.8V
    pub const SPI_VOLTAGE: Pin = Pin(2);
    /// SPI VCC enable (active low)
    pub const SPI_VCC: Pin = Pin(3);
    /// DUT reset button
    pub const RESET: Pin = Pin(8);
    /// DUT power button
    pub const POWER: Pin = Pin(9);
    /// CMOS clear jumper
    pub const CMOS: Pin = Pin(11);
    /// DUT power LED sense
    pub const PWR_LED: Pin = Pin(13);

    /// Validate a raw GPIO number
    pub fn new(index: u8) -> Result<Self> {
        if (GPIO_MIN..=GPIO_MAX).contains(&index) {
            Ok(Pin(index))
        } else {
            Err(Error::InvalidPinNumber(index))
        }
    }

    /// The GPIO number
    pub fn index(self) -> u8 {
        self.0
    }

    /// Electrical kind of this pin
    pub fn kind(self) -> PinKind {
        match self.0 {
            1..=12 => PinKind::OpenCollector,
            _ => PinKind::Regular,
        }
    }

    /// Map a semantic state to the raw value the RTE API expects
    ///
    /// Raw 1 means "asserted": high on regular pins, pulled low on
    /// open-collector pins.
    pub fn raw_for(self, state: PinState) -> Result<u8> {
        match (self.kind(), state) {
            (PinKind::Regular, PinState::High) => Ok(1),
            (PinKind::Regular, PinState::Low) => Ok(0),
            (PinKind::OpenCollector, PinState::Low) => Ok(1),
            (PinKind::OpenCollector, PinState::HighZ) => Ok(0),
            _ => Err(Error::InvalidPinState { pin: self, state }),
        }
    }

    /// Map a raw value reported by the RTE API to a semantic state
    ///
    /// Only the lowest bit is significant.
    pub fn state_from_raw(self, raw: u8) -> PinState {
        let asserted = raw % 2 == 1;
        match (self.kind(), asserted) {
            (PinKind::Regular, true) => PinState::High,
            (PinKind::Regular, false) => PinState::Low,
            (PinKind::OpenCollector, true) => PinState::Low,
            (PinKind::OpenCollector, false) => PinState::HighZ,
        }
    }
}

impl TryFrom<u8> for Pin {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Pin::new(index)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
