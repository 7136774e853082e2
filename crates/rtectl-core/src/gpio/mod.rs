//! RTE GPIO port abstraction
//!
//! The RTE exposes 20 logical GPIO lines. Line 0 and lines 13-19 are regular
//! push-pull outputs ("high"/"low"); lines 1-12 are open-collector outputs
//! that can only pull the line active ("low") or release it ("high-z").
//!
//! The board itself is reached through a [`GpioTransport`], which only knows
//! about raw line values. [`GpioPort`] layers the per-kind state rules on top.

mod port;
mod types;

pub use port::{GpioPort, GpioTransport};
pub use types::*;
