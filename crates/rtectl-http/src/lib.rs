//! rtectl-http - HTTP transports for rtectl
//!
//! - [`RteGpio`] drives the RTE GPIO lines through its REST API and plugs
//!   into [`rtectl_core::gpio::GpioPort`]
//! - [`SonoffPlug`] switches the DUT power supply through a Tasmota Sonoff
//!   and implements [`rtectl_core::power::PowerSwitch`]
//! - [`SnipeIt`] implements [`rtectl_core::inventory::AssetRegistry`]
//!
//! Connection failures convert to [`rtectl_core::Error::Transport`], every
//! other failure to [`rtectl_core::Error::Rejected`].

#![warn(missing_docs)]

pub mod error;
pub mod gpio;
pub mod snipeit;
pub mod sonoff;

pub use error::{HttpError, Result};
pub use gpio::RteGpio;
pub use snipeit::{SnipeIt, SnipeItConfig};
pub use sonoff::SonoffPlug;
