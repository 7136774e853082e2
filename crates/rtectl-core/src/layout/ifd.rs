//! Intel Flash Descriptor (IFD) parsing
//!
//! The descriptor starts with the FLVALSIG signature, either at offset 0 or
//! after 16 bytes of padding. FLMAP0 follows the signature and locates the
//! region table (FRBA), 16 FLREG words describing where each region lives.
//!
//! Reference: flashrom/util/ich_descriptor_tool.c

use std::path::Path;

use crate::error::{Error, Result};

/// Descriptor signature
pub const FLVALSIG: u32 = 0x0FF0_A55A;

/// Offsets probed for [`FLVALSIG`], in order
pub const SIGNATURE_OFFSETS: [usize; 2] = [0x00, 0x10];

/// Number of FLREG words in the region table
pub const REGION_COUNT: usize = 16;

/// FLREG value of an unused region
pub const EMPTY_REGION: u32 = 0x0000_7FFF;

/// Region names by FLREG index
pub const REGION_NAMES: [&str; REGION_COUNT] = [
    "fd",    // 0: Flash Descriptor
    "bios",  // 1: BIOS
    "me",    // 2: Intel ME
    "gbe",   // 3: Gigabit Ethernet
    "pd",    // 4: Platform Data
    "reg5",  // 5
    "bios2", // 6: Secondary BIOS
    "reg7",  // 7
    "ec",    // 8: Embedded Controller
    "reg9",  // 9
    "ie",    // 10: Innovation Engine
    "10gbe", // 11: 10 Gigabit Ethernet
    "reg12", "reg13", "reg14", "reg15",
];

/// Index of a region name in the FLREG table (case sensitive)
pub fn region_index(name: &str) -> Result<usize> {
    REGION_NAMES
        .iter()
        .position(|&n| n == name)
        .ok_or_else(|| Error::UnknownRegion(name.to_string()))
}

fn read_le32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Inclusive byte range of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    /// First byte
    pub base: usize,
    /// Last byte
    pub limit: usize,
}

impl RegionBounds {
    /// Decode a FLREG word, `None` for an unused region
    ///
    /// A base above the limit describes no bytes and is unused as well.
    pub fn from_flreg(flreg: u32) -> Option<Self> {
        if flreg == EMPTY_REGION {
            return None;
        }
        let base = (flreg << 12) & 0x07FF_F000;
        let limit = ((flreg >> 4) & 0x07FF_F000) | 0xFFF;
        if base > limit {
            return None;
        }
        Some(Self {
            base: base as usize,
            limit: limit as usize,
        })
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        (self.limit + 1).saturating_sub(self.base)
    }
}

/// Parsed descriptor header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Offset FLVALSIG was found at
    pub signature_offset: usize,
    /// Flash map register 0
    pub flmap0: u32,
    /// Flash region base address
    pub frba: usize,
    /// FLREG words by region index
    pub regions: [u32; REGION_COUNT],
}

impl Descriptor {
    /// Locate and parse the descriptor in `data`
    pub fn parse(data: &[u8]) -> Result<Self> {
        let signature_offset = SIGNATURE_OFFSETS
            .iter()
            .copied()
            .find(|&off| read_le32(data, off) == Some(FLVALSIG))
            .ok_or(Error::InvalidDescriptor)?;

        let flmap0 = read_le32(data, signature_offset + 4).ok_or(Error::InvalidDescriptor)?;
        let frba = ((flmap0 >> 12) & 0xFF0) as usize;

        let mut regions = [0u32; REGION_COUNT];
        for (i, word) in regions.iter_mut().enumerate() {
            *word = read_le32(data, frba + i * 4).ok_or(Error::InvalidDescriptor)?;
        }

        log::debug!(
            "FLVALSIG at {:#x}, FLMAP0 {:#010x}, FRBA {:#06x}",
            signature_offset,
            flmap0,
            frba
        );

        Ok(Self {
            signature_offset,
            flmap0,
            frba,
            regions,
        })
    }
}

/// A firmware image with its parsed descriptor
#[derive(Debug, Clone)]
pub struct FlashImage {
    data: Vec<u8>,
    descriptor: Descriptor,
}

impl FlashImage {
    /// Parse the descriptor of an in-memory image
    pub fn load(data: Vec<u8>) -> Result<Self> {
        let descriptor = Descriptor::parse(&data)?;
        Ok(Self { data, descriptor })
    }

    /// Read and parse an image file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(std::fs::read(path)?)
    }

    /// Raw image bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Parsed descriptor
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// FLREG word of a region
    pub fn flreg(&self, index: usize) -> Result<u32> {
        self.descriptor
            .regions
            .get(index)
            .copied()
            .ok_or_else(|| Error::UnknownRegion(index.to_string()))
    }

    /// Byte range of a region, failing for unused regions
    pub fn region_bounds(&self, index: usize) -> Result<RegionBounds> {
        let flreg = self.flreg(index)?;
        RegionBounds::from_flreg(flreg).ok_or_else(|| Error::RegionEmpty {
            name: REGION_NAMES[index].to_string(),
            index,
        })
    }

    /// Contents of a region
    ///
    /// Fails for unused regions and for regions reaching past the image.
    pub fn region_slice(&self, index: usize) -> Result<&[u8]> {
        let bounds = self.region_bounds(index)?;
        self.data
            .get(bounds.base..=bounds.limit)
            .ok_or_else(|| Error::RegionOutOfBounds {
                name: REGION_NAMES[index].to_string(),
                base: bounds.base,
                limit: bounds.limit,
                size: self.data.len(),
            })
    }
}
