//! Flash image layout inspection
//!
//! Parses the Intel Flash Descriptor of a firmware image and checks that
//! named regions are present and hold real data. The write path uses this
//! as a gate against images that would wipe factory-sensitive regions.

mod check;
pub mod ifd;

pub use check::{
    required_regions, Finding, RegionChecker, RegionReport, BIOS_WRITE_REGIONS,
    FULL_WRITE_REGIONS,
};
pub use ifd::{region_index, Descriptor, FlashImage, RegionBounds, REGION_NAMES};
