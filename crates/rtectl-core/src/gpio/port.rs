//! GPIO port with per-kind state validation

use std::time::Duration;

use super::{Pin, PinState};
use crate::error::{Error, Result};

/// Raw access to the RTE GPIO lines
///
/// Implementations only move raw values (1 = asserted, 0 = released); state
/// naming and validation happen in [`GpioPort`].
pub trait GpioTransport {
    /// Read the raw value of a line
    fn read_raw(&mut self, pin: Pin) -> Result<u8>;

    /// Drive a line to a raw value
    ///
    /// A non-zero `hold` asks the RTE to time the assertion itself (button
    /// presses). The call returns once the RTE acknowledged the request, it
    /// does not wait for `hold` to elapse.
    fn write_raw(&mut self, pin: Pin, raw: u8, hold: Duration) -> Result<()>;
}

impl<T: GpioTransport + ?Sized> GpioTransport for Box<T> {
    fn read_raw(&mut self, pin: Pin) -> Result<u8> {
        (**self).read_raw(pin)
    }

    fn write_raw(&mut self, pin: Pin, raw: u8, hold: Duration) -> Result<()> {
        (**self).write_raw(pin, raw, hold)
    }
}

/// Semantic GPIO access on top of a [`GpioTransport`]
#[derive(Debug, Clone)]
pub struct GpioPort<T> {
    transport: T,
}

impl<T: GpioTransport> GpioPort<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Access the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Read the state of a pin
    ///
    /// Transport failures propagate.
    pub fn get(&mut self, pin: Pin) -> Result<PinState> {
        let raw = self.transport.read_raw(pin)?;
        let state = pin.state_from_raw(raw);
        log::trace!("GPIO {} reads {} (raw {})", pin, state, raw);
        Ok(state)
    }

    /// Set the state of a pin, optionally timed by the RTE
    ///
    /// Invalid states for the pin kind are rejected before any I/O. Connection
    /// failures are logged and swallowed so that a flaky control plane does
    /// not abort a sequence halfway; refusals by the RTE still propagate.
    pub fn set(&mut self, pin: Pin, state: PinState, hold: Duration) -> Result<()> {
        let raw = pin.raw_for(state)?;
        log::debug!("GPIO {} -> {} (hold {}s)", pin, state, hold.as_secs());
        match self.transport.write_raw(pin, raw, hold) {
            Err(Error::Transport(msg)) => {
                log::warn!("Failed while setting GPIO {}: {}", pin, msg);
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, Log, MockGpio};

    #[test]
    fn test_open_collector_round_trip() {
        let mut port = GpioPort::new(MockGpio::new(Log::default()));
        for i in 1..=12 {
            let pin = Pin::new(i).unwrap();
            port.set(pin, PinState::Low, Duration::ZERO).unwrap();
            assert_eq!(port.get(pin).unwrap(), PinState::Low);
            port.set(pin, PinState::HighZ, Duration::ZERO).unwrap();
            assert_eq!(port.get(pin).unwrap(), PinState::HighZ);
            assert!(matches!(
                port.set(pin, PinState::High, Duration::ZERO),
                Err(Error::InvalidPinState { .. })
            ));
        }
    }

    #[test]
    fn test_regular_round_trip() {
        let mut port = GpioPort::new(MockGpio::new(Log::default()));
        for i in [0u8, 13, 14, 15, 16, 17, 18, 19] {
            let pin = Pin::new(i).unwrap();
            port.set(pin, PinState::High, Duration::ZERO).unwrap();
            assert_eq!(port.get(pin).unwrap(), PinState::High);
            port.set(pin, PinState::Low, Duration::ZERO).unwrap();
            assert_eq!(port.get(pin).unwrap(), PinState::Low);
            assert!(port.set(pin, PinState::HighZ, Duration::ZERO).is_err());
        }
    }

    #[test]
    fn test_invalid_state_does_no_io() {
        let log = Log::default();
        let mut port = GpioPort::new(MockGpio::new(log.clone()));
        assert!(port.set(Pin::RELAY, PinState::HighZ, Duration::ZERO).is_err());
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_write_connection_failure_is_swallowed() {
        let log = Log::default();
        let mut gpio = MockGpio::new(log.clone());
        gpio.fail_writes(true);
        let mut port = GpioPort::new(gpio);
        port.set(Pin::POWER, PinState::Low, Duration::from_secs(3)).unwrap();
        assert_eq!(
            log.events(),
            vec![Event::Gpio {
                pin: 9,
                raw: 1,
                hold: 3
            }]
        );
    }

    #[test]
    fn test_read_connection_failure_propagates() {
        let mut gpio = MockGpio::new(Log::default());
        gpio.fail_reads(true);
        let mut port = GpioPort::new(gpio);
        assert!(port.get(Pin::RELAY).unwrap_err().is_transport());
    }

    #[test]
    fn test_write_rejection_propagates() {
        let mut gpio = MockGpio::new(Log::default());
        gpio.reject_writes(true);
        let mut port = GpioPort::new(gpio);
        assert!(matches!(
            port.set(Pin::RELAY, PinState::High, Duration::ZERO),
            Err(Error::Rejected(_))
        ));
    }
}
