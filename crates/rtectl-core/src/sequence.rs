//! Power and SPI sequencing of the DUT
//!
//! [`Rte`] owns every collaborator needed to move a DUT between power states:
//! the RTE GPIO port, the PSU switch selected from the model configuration
//! and the [`Delay`] used for settle times. Nothing is remembered between
//! invocations; each sequence starts from an unknown physical state and
//! drives to a known one.
//!
//! External flashing is bracketed by [`Rte::power_for_flash`], which runs the
//! pre-flash sequence and returns a [`FlashPowerGuard`]. Dropping the guard
//! runs the post-flash sequence on every exit path.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crate::delay::Delay;
use crate::error::{Error, Result};
use crate::gpio::{GpioPort, GpioTransport, Pin, PinState};
use crate::model::{LedPolarity, ModelConfig, PowerState, SpiVoltage};
use crate::power::{PowerSwitch, PsuState};

/// Default hold of a short power button press
pub const POWER_ON_HOLD: Duration = Duration::from_secs(1);
/// Default hold of a forced power off
pub const POWER_OFF_HOLD: Duration = Duration::from_secs(6);
/// Default hold of the reset button
pub const RESET_HOLD: Duration = Duration::from_secs(1);

/// Settle time after connecting the PSU
pub const PSU_ON_SETTLE: Duration = Duration::from_secs(5);
/// Settle time after disconnecting the PSU
pub const PSU_OFF_SETTLE: Duration = Duration::from_secs(2);

/// Power button presses used to bleed residual charge
pub const DISCHARGE_PRESSES: usize = 5;
/// Hold of each discharge press
pub const DISCHARGE_HOLD: Duration = Duration::from_secs(3);

/// Wait after selecting the SPI voltage
pub const SPI_VOLTAGE_SETTLE: Duration = Duration::from_secs(2);
/// Wait after enabling SPI VCC
pub const SPI_VCC_SETTLE: Duration = Duration::from_secs(2);
/// Wait after connecting the SPI lines
pub const SPI_ON_SETTLE: Duration = Duration::from_secs(10);

/// Extra wait after the initial PSU on of the pre-flash sequence
pub const PRE_FLASH_PSU_SETTLE: Duration = Duration::from_secs(5);
/// Wait after forcing the DUT into S5
pub const PRE_FLASH_S5_SETTLE: Duration = Duration::from_secs(10);
/// Wait after enabling SPI in the pre-flash sequence
pub const PRE_FLASH_SPI_SETTLE: Duration = Duration::from_secs(3);
/// Wait after disabling SPI in the post-flash sequence
pub const POST_FLASH_SPI_SETTLE: Duration = Duration::from_secs(2);

/// How long the CMOS clear line is held
pub const CMOS_CLEAR_HOLD: Duration = Duration::from_secs(10);

/// Controller for one DUT attached to an RTE
pub struct Rte<G, P, D> {
    gpio: GpioPort<G>,
    psu: P,
    delay: D,
    model: ModelConfig,
}

impl<G: GpioTransport, P: PowerSwitch, D: Delay> Rte<G, P, D> {
    /// Bind the collaborators for one DUT
    pub fn new(gpio: GpioPort<G>, psu: P, delay: D, model: ModelConfig) -> Self {
        Self {
            gpio,
            psu,
            delay,
            model,
        }
    }

    /// The model configuration this controller was built for
    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    /// Block for `duration` through the injected delay
    pub fn sleep(&mut self, duration: Duration) {
        self.delay.sleep(duration);
    }

    /// Direct access to the injected delay
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Read one GPIO line
    pub fn gpio_get(&mut self, pin: Pin) -> Result<PinState> {
        self.gpio.get(pin)
    }

    /// Set one GPIO line, optionally timed by the RTE
    pub fn gpio_set(&mut self, pin: Pin, state: PinState, hold: Duration) -> Result<()> {
        self.gpio.set(pin, state, hold)
    }

    fn press(&mut self, pin: Pin, hold: Duration) -> Result<()> {
        self.gpio.set(pin, PinState::Low, hold)?;
        self.delay.sleep(hold);
        Ok(())
    }

    /// Press the power button for `hold` and wait it out
    pub fn power_on(&mut self, hold: Duration) -> Result<()> {
        log::info!("Pressing power button for {}s", hold.as_secs());
        self.press(Pin::POWER, hold)
    }

    /// Hold the power button for `hold` to force the DUT off
    pub fn power_off(&mut self, hold: Duration) -> Result<()> {
        log::info!("Holding power button for {}s", hold.as_secs());
        self.press(Pin::POWER, hold)
    }

    /// Press the reset button for `hold`
    pub fn reset(&mut self, hold: Duration) -> Result<()> {
        log::info!("Pressing reset button for {}s", hold.as_secs());
        self.press(Pin::RESET, hold)
    }

    /// State of the RTE relay
    pub fn relay_get(&mut self) -> Result<PsuState> {
        match self.gpio.get(Pin::RELAY)? {
            PinState::High => Ok(PsuState::On),
            PinState::Low | PinState::HighZ => Ok(PsuState::Off),
        }
    }

    /// Drive the RTE relay
    pub fn relay_set(&mut self, state: PsuState) -> Result<()> {
        let pin_state = match state {
            PsuState::On => PinState::High,
            PsuState::Off => PinState::Low,
        };
        self.gpio.set(Pin::RELAY, pin_state, Duration::ZERO)
    }

    /// Flip the RTE relay and return the new state
    pub fn relay_toggle(&mut self) -> Result<PsuState> {
        let next = self.relay_get()?.toggled();
        self.relay_set(next)?;
        Ok(next)
    }

    /// State of the PSU as reported by its switch
    pub fn psu_get(&mut self) -> Result<PsuState> {
        self.psu.state()
    }

    fn switch_psu(&mut self, state: PsuState) -> Result<()> {
        self.psu.set_state(state)?;
        let actual = self.psu.state()?;
        if actual != state {
            return Err(Error::PsuStateMismatch {
                expected: state,
                actual,
            });
        }
        Ok(())
    }

    /// Connect the PSU, verify it and let it settle
    pub fn psu_on(&mut self) -> Result<()> {
        log::info!("Turning PSU on");
        self.switch_psu(PsuState::On)?;
        self.delay.sleep(PSU_ON_SETTLE);
        Ok(())
    }

    /// Disconnect the PSU, verify it and let it settle
    pub fn psu_off(&mut self) -> Result<()> {
        log::info!("Turning PSU off");
        self.switch_psu(PsuState::Off)?;
        self.delay.sleep(PSU_OFF_SETTLE);
        Ok(())
    }

    /// Bleed residual charge by pressing the power button repeatedly
    pub fn discharge_psu(&mut self) -> Result<()> {
        log::info!("Discharging PSU");
        for _ in 0..DISCHARGE_PRESSES {
            self.power_off(DISCHARGE_HOLD)?;
        }
        Ok(())
    }

    /// Pulse the CMOS clear line
    pub fn reset_cmos(&mut self) -> Result<()> {
        log::info!("Clearing CMOS");
        self.gpio.set(Pin::CMOS, PinState::Low, Duration::ZERO)?;
        self.delay.sleep(CMOS_CLEAR_HOLD);
        self.gpio.set(Pin::CMOS, PinState::HighZ, Duration::ZERO)
    }

    /// Whether the DUT power LED is lit
    pub fn power_led(&mut self) -> Result<bool> {
        let high = self.gpio.get(Pin::PWR_LED)? == PinState::High;
        Ok(match self.model.pwr_led_polarity {
            LedPolarity::ActiveHigh => high,
            LedPolarity::ActiveLow => !high,
        })
    }

    /// Connect the RTE SPI lines to the DUT flash
    pub fn spi_enable(&mut self) -> Result<()> {
        let voltage = self.model.flash_chip.voltage;
        log::info!("Enabling SPI lines at {}", voltage);

        let voltage_state = match voltage {
            SpiVoltage::V1_8 => PinState::HighZ,
            SpiVoltage::V3_3 => PinState::Low,
        };
        self.gpio
            .set(Pin::SPI_VOLTAGE, voltage_state, Duration::ZERO)?;
        self.delay.sleep(SPI_VOLTAGE_SETTLE);

        self.gpio.set(Pin::SPI_VCC, PinState::Low, Duration::ZERO)?;
        self.delay.sleep(SPI_VCC_SETTLE);

        self.gpio.set(Pin::SPI_ON, PinState::Low, Duration::ZERO)?;
        self.delay.sleep(SPI_ON_SETTLE);
        Ok(())
    }

    /// Release the RTE SPI lines
    pub fn spi_disable(&mut self) -> Result<()> {
        log::info!("Disabling SPI lines");
        self.gpio.set(Pin::SPI_VCC, PinState::HighZ, Duration::ZERO)?;
        self.gpio.set(Pin::SPI_ON, PinState::HighZ, Duration::ZERO)
    }

    /// Bring the DUT into the power state required for external flashing
    pub fn pre_flash(&mut self) -> Result<()> {
        let programmer = self.model.programmer;
        let power_state = self.model.flashing_power_state;
        log::info!(
            "Preparing DUT for flashing with {} in {}",
            programmer,
            power_state
        );

        // Always start from a powered PSU
        self.psu_on()?;
        self.delay.sleep(PRE_FLASH_PSU_SETTLE);

        self.power_off(POWER_OFF_HOLD)?;
        self.delay.sleep(PRE_FLASH_S5_SETTLE);

        // Some boards only detect the chip if SPI comes up while the PSU is on
        if programmer.uses_rte_spi_lines() {
            self.spi_enable()?;
            self.delay.sleep(PRE_FLASH_SPI_SETTLE);
        }

        match power_state {
            PowerState::S5 => {}
            PowerState::G3 => {
                self.psu_off()?;
                self.discharge_psu()?;
            }
        }
        Ok(())
    }

    /// Undo the SPI changes of [`Rte::pre_flash`]
    pub fn post_flash(&mut self) -> Result<()> {
        if self.model.programmer.uses_rte_spi_lines() {
            self.spi_disable()?;
            self.delay.sleep(POST_FLASH_SPI_SETTLE);
        }
        Ok(())
    }

    /// Run the pre-flash sequence and arm the post-flash one
    ///
    /// A failing pre-flash sequence aborts without running the post-flash
    /// one. Once this returns, the post-flash sequence runs when the guard
    /// is dropped.
    pub fn power_for_flash(&mut self) -> Result<FlashPowerGuard<'_, G, P, D>> {
        self.pre_flash()?;
        Ok(FlashPowerGuard { rte: self })
    }
}

/// Keeps the DUT in its flashing power state until dropped
pub struct FlashPowerGuard<'a, G: GpioTransport, P: PowerSwitch, D: Delay> {
    rte: &'a mut Rte<G, P, D>,
}

impl<G: GpioTransport, P: PowerSwitch, D: Delay> Deref for FlashPowerGuard<'_, G, P, D> {
    type Target = Rte<G, P, D>;

    fn deref(&self) -> &Self::Target {
        self.rte
    }
}

impl<G: GpioTransport, P: PowerSwitch, D: Delay> DerefMut for FlashPowerGuard<'_, G, P, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.rte
    }
}

impl<G: GpioTransport, P: PowerSwitch, D: Delay> Drop for FlashPowerGuard<'_, G, P, D> {
    fn drop(&mut self) {
        if let Err(e) = self.rte.post_flash() {
            log::error!("Post-flash sequence failed: {}", e);
        }
    }
}
