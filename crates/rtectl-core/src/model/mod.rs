//! DUT model configuration
//!
//! Every supported DUT model is described by a TOML file in the models
//! directory:
//!
//! ```toml
//! reset_cmos = true
//!
//! [programmer]
//! name = "rte_1_1"
//!
//! [flash_chip]
//! voltage = "3.3V"
//! model = "W25Q128.V"
//!
//! [pwr_ctrl]
//! sonoff = false
//! relay = true
//! flashing_power_state = "G3"
//! ```
//!
//! Files are validated into an immutable [`ModelConfig`] before any hardware
//! is touched. Invalid files are never patched up with defaults.

mod database;
mod types;

pub use database::{ModelDatabase, ModelStatus, MODEL_FILE_EXTENSION};
pub use types::*;
