//! DUT main power supply control
//!
//! The PSU is switched either by the relay on the RTE board or by a Sonoff
//! smart plug, chosen once from the model configuration. Both are driven
//! through [`PowerSwitch`].

use core::fmt;
use core::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::gpio::{GpioPort, GpioTransport, Pin, PinState};

/// State of the DUT power supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsuState {
    /// Power delivered
    On,
    /// Power cut
    Off,
}

impl PsuState {
    /// The opposite state
    pub fn toggled(self) -> Self {
        match self {
            PsuState::On => PsuState::Off,
            PsuState::Off => PsuState::On,
        }
    }
}

impl fmt::Display for PsuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsuState::On => f.write_str("ON"),
            PsuState::Off => f.write_str("OFF"),
        }
    }
}

impl FromStr for PsuState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("on") {
            Ok(PsuState::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(PsuState::Off)
        } else {
            Err(Error::UnknownPsuState(s.to_string()))
        }
    }
}

/// A device able to switch the DUT power supply
pub trait PowerSwitch {
    /// Connect the power supply
    fn turn_on(&mut self) -> Result<()>;

    /// Disconnect the power supply
    fn turn_off(&mut self) -> Result<()>;

    /// Read back the current state
    fn state(&mut self) -> Result<PsuState>;

    /// Drive to `state`
    fn set_state(&mut self, state: PsuState) -> Result<()> {
        match state {
            PsuState::On => self.turn_on(),
            PsuState::Off => self.turn_off(),
        }
    }
}

impl<P: PowerSwitch + ?Sized> PowerSwitch for Box<P> {
    fn turn_on(&mut self) -> Result<()> {
        (**self).turn_on()
    }

    fn turn_off(&mut self) -> Result<()> {
        (**self).turn_off()
    }

    fn state(&mut self) -> Result<PsuState> {
        (**self).state()
    }
}

/// PSU switched by the relay on GPIO 0 of the RTE
#[derive(Debug, Clone)]
pub struct RelaySwitch<T> {
    gpio: GpioPort<T>,
}

impl<T: GpioTransport> RelaySwitch<T> {
    /// Create a relay switch on its own handle to the RTE GPIO port
    pub fn new(gpio: GpioPort<T>) -> Self {
        Self { gpio }
    }
}

impl<T: GpioTransport> PowerSwitch for RelaySwitch<T> {
    fn turn_on(&mut self) -> Result<()> {
        self.gpio.set(Pin::RELAY, PinState::High, Duration::ZERO)
    }

    fn turn_off(&mut self) -> Result<()> {
        self.gpio.set(Pin::RELAY, PinState::Low, Duration::ZERO)
    }

    fn state(&mut self) -> Result<PsuState> {
        match self.gpio.get(Pin::RELAY)? {
            PinState::High => Ok(PsuState::On),
            // Pin 0 is a regular pin, so high-z never comes back
            PinState::Low | PinState::HighZ => Ok(PsuState::Off),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Log, MockGpio};

    #[test]
    fn test_relay_switch() {
        let gpio = MockGpio::new(Log::default());
        let mut relay = RelaySwitch::new(GpioPort::new(gpio.clone()));

        relay.turn_on().unwrap();
        assert_eq!(relay.state().unwrap(), PsuState::On);
        assert_eq!(gpio.raw(0), 1);

        relay.set_state(PsuState::Off).unwrap();
        assert_eq!(relay.state().unwrap(), PsuState::Off);
        assert_eq!(gpio.raw(0), 0);
    }

    #[test]
    fn test_parse_state() {
        assert_eq!("ON".parse::<PsuState>().unwrap(), PsuState::On);
        assert_eq!("off".parse::<PsuState>().unwrap(), PsuState::Off);
        assert!("maybe".parse::<PsuState>().is_err());
        assert_eq!(PsuState::On.toggled(), PsuState::Off);
    }
}
