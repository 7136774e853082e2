//! Region presence checks and dumps

use std::path::{Path, PathBuf};

use super::ifd::{region_index, FlashImage, RegionBounds};
use crate::error::{Error, Result};

/// Regions that must hold data before writing a full image
pub const FULL_WRITE_REGIONS: [&str; 2] = ["bios", "me"];
/// Regions that must hold data before writing the BIOS region only
pub const BIOS_WRITE_REGIONS: [&str; 1] = ["bios"];

/// Regions the write gate checks
pub fn required_regions(bios_only: bool) -> &'static [&'static str] {
    if bios_only {
        &BIOS_WRITE_REGIONS
    } else {
        &FULL_WRITE_REGIONS
    }
}

/// What a region check found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finding {
    /// Region marked unused in the descriptor or describing no bytes
    Empty,
    /// Region present but every byte equals this value
    Filled(u8),
    /// Region present with varying content
    Data,
}

impl Finding {
    /// Whether the finding fails the check
    pub fn is_failure(self) -> bool {
        self != Finding::Data
    }
}

/// Outcome of checking one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    /// Region name
    pub name: String,
    /// FLREG index
    pub index: usize,
    /// Raw FLREG word
    pub flreg: u32,
    /// Decoded bounds, `None` for unused regions
    pub bounds: Option<RegionBounds>,
    /// Result of the check
    pub finding: Finding,
}

/// Checks named regions of an image and tracks an overall verdict
///
/// Any failure is sticky: later successful checks do not clear it.
#[derive(Debug)]
pub struct RegionChecker<'a> {
    image: &'a FlashImage,
    failed: bool,
}

impl<'a> RegionChecker<'a> {
    /// Start checking `image`
    pub fn new(image: &'a FlashImage) -> Self {
        Self {
            image,
            failed: false,
        }
    }

    fn lookup(&mut self, name: &str) -> Result<usize> {
        region_index(name).inspect_err(|_| self.failed = true)
    }

    /// Check that a region is present and not filled with a single value
    ///
    /// Unknown names and regions reaching past the image are errors; empty
    /// and uniformly filled regions are reported as findings.
    pub fn check(&mut self, name: &str) -> Result<RegionReport> {
        let index = self.lookup(name)?;
        let flreg = self.image.flreg(index)?;

        let finding = match self.image.region_slice(index) {
            Ok(data) => match data.first() {
                Some(&first) if data.iter().all(|&b| b == first) => Finding::Filled(first),
                _ => Finding::Data,
            },
            Err(Error::RegionEmpty { .. }) => Finding::Empty,
            Err(e) => {
                self.failed = true;
                return Err(e);
            }
        };

        if finding.is_failure() {
            self.failed = true;
        }
        log::debug!("Region {} ({}): {:?}", name, index, finding);

        Ok(RegionReport {
            name: name.to_string(),
            index,
            flreg,
            bounds: self.image.region_bounds(index).ok(),
            finding,
        })
    }

    /// Write a region to `<name>_dump.bin` in `dir`
    pub fn dump(&mut self, name: &str, dir: &Path) -> Result<PathBuf> {
        let index = self.lookup(name)?;
        let data = self.image.region_slice(index).inspect_err(|_| self.failed = true)?;

        let path = dir.join(format!("{}_dump.bin", name));
        std::fs::write(&path, data).inspect_err(|_| self.failed = true)?;
        log::debug!("Dumped {} bytes of {} to {}", data.len(), name, path.display());
        Ok(path)
    }

    /// Whether any check or dump failed so far
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Process exit code for the checks so far, always 0 in dry mode
    pub fn exit_code(&self, dry: bool) -> i32 {
        if self.failed && !dry {
            1
        } else {
            0
        }
    }
}
