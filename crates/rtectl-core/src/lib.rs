//! rtectl-core - Core library for RTE-driven DUT flashing
//!
//! This crate contains everything that does not talk to the network directly:
//!
//! - [`gpio`] - logical pin numbering and state rules of the RTE board
//! - [`power`] - the PSU capability (relay or smart plug) and its states
//! - [`model`] - per-DUT model configuration and the model database
//! - [`sequence`] - power/SPI sequencing around external flashing
//! - [`flash`] - remote flashrom invocation over an injected session
//! - [`layout`] - Intel Flash Descriptor parsing and region checks
//! - [`inventory`] - asset checkout bookkeeping around invasive commands
//!
//! Transports (HTTP for GPIO and Sonoff, SSH for flashrom) live in the
//! `rtectl-http` and `rtectl-ssh` crates and plug in through the traits
//! defined here.
//!
//! # Example
//!
//! ```ignore
//! use rtectl_core::{delay::StdDelay, gpio::GpioPort, power::RelaySwitch, sequence::Rte};
//!
//! let gpio = GpioPort::new(transport.clone());
//! let psu = RelaySwitch::new(GpioPort::new(transport));
//! let mut rte = Rte::new(gpio, psu, StdDelay, model);
//! rte.psu_on()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod delay;
pub mod error;
pub mod flash;
pub mod gpio;
pub mod inventory;
pub mod layout;
pub mod model;
pub mod power;
pub mod sequence;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
