//! Model configuration types

use core::fmt;
use core::str::FromStr;

use crate::error::{Error, Result};

/// Programmer used to reach the DUT flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Programmer {
    /// SPI header of RTE rev 1.1, needs SPI lines switched on by GPIO
    Rte1_1,
    /// SPI header of RTE rev 1.0
    Rte1_0,
    /// CH341A USB programmer attached to the RTE
    Ch341a,
    /// Dediprog programmer attached to the RTE
    Dediprog,
}

impl Programmer {
    /// Name used in model files
    pub fn as_str(self) -> &'static str {
        match self {
            Programmer::Rte1_1 => "rte_1_1",
            Programmer::Rte1_0 => "rte_1_0",
            Programmer::Ch341a => "ch341a",
            Programmer::Dediprog => "dediprog",
        }
    }

    /// Whether the SPI lines of the RTE must be switched for this programmer
    pub fn uses_rte_spi_lines(self) -> bool {
        self == Programmer::Rte1_1
    }
}

impl fmt::Display for Programmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Programmer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rte_1_1" => Ok(Programmer::Rte1_1),
            "rte_1_0" => Ok(Programmer::Rte1_0),
            "ch341a" => Ok(Programmer::Ch341a),
            "dediprog" => Ok(Programmer::Dediprog),
            other => Err(Error::UnsupportedProgrammer(other.to_string())),
        }
    }
}

/// Flash chip supply voltage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiVoltage {
    /// 1.8V
    V1_8,
    /// 3.3V
    V3_3,
}

impl SpiVoltage {
    /// Name used in model files
    pub fn as_str(self) -> &'static str {
        match self {
            SpiVoltage::V1_8 => "1.8V",
            SpiVoltage::V3_3 => "3.3V",
        }
    }
}

impl fmt::Display for SpiVoltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpiVoltage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1.8V" => Ok(SpiVoltage::V1_8),
            "3.3V" => Ok(SpiVoltage::V3_3),
            other => Err(Error::SpiWrongVoltage(other.to_string())),
        }
    }
}

/// Power state the DUT must be in while its flash is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Soft off, PSU still connected
    S5,
    /// Mechanical off, PSU disconnected and discharged
    G3,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::S5 => f.write_str("S5"),
            PowerState::G3 => f.write_str("G3"),
        }
    }
}

impl FromStr for PowerState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "S5" => Ok(PowerState::S5),
            "G3" => Ok(PowerState::G3),
            other => Err(Error::UnsupportedPowerState(other.to_string())),
        }
    }
}

/// Device that switches the DUT power supply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerControl {
    /// Sonoff smart plug
    Sonoff,
    /// RTE relay
    Relay,
}

/// Polarity of the power LED sense line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedPolarity {
    /// Line high while the LED is lit
    #[default]
    ActiveHigh,
    /// Line low while the LED is lit
    ActiveLow,
}

impl FromStr for LedPolarity {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, String> {
        match s {
            "active high" => Ok(LedPolarity::ActiveHigh),
            "active low" => Ok(LedPolarity::ActiveLow),
            other => Err(format!("unknown power LED polarity '{}'", other)),
        }
    }
}

/// One entry of an explicit flash layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRegion {
    /// First byte of the region
    pub start: u32,
    /// Last byte of the region (inclusive)
    pub end: u32,
    /// Region name
    pub name: String,
}

impl LayoutRegion {
    /// Parse a flashrom style `start:end` range
    pub fn parse(range: &str, name: &str) -> core::result::Result<Self, String> {
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| format!("layout range '{}' is not in start:end form", range))?;
        let start = parse_hex(start)?;
        let end = parse_hex(end)?;
        if start > end {
            return Err(format!("layout range '{}' ends before it starts", range));
        }
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(format!("invalid layout region name '{}'", name));
        }
        Ok(Self {
            start,
            end,
            name: name.to_string(),
        })
    }

    /// The `<range> <name>` line flashrom expects in a layout file
    pub fn to_layout_line(&self) -> String {
        format!("{:#010x}:{:#010x} {}", self.start, self.end, self.name)
    }
}

fn parse_hex(s: &str) -> core::result::Result<u32, String> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

/// Flash chip description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashChip {
    /// Supply voltage
    pub voltage: SpiVoltage,
    /// Explicit flashrom chip name, if probing is ambiguous
    pub model: Option<String>,
    /// Explicit layout used instead of the flash descriptor
    pub layout: Vec<LayoutRegion>,
}

/// Validated configuration of one DUT model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Model name (file stem in the models directory)
    pub name: String,
    /// Programmer used for flashing
    pub programmer: Programmer,
    /// Flash chip description
    pub flash_chip: FlashChip,
    /// How the PSU is switched
    pub power_control: PowerControl,
    /// Power state required while flashing
    pub flashing_power_state: PowerState,
    /// Clear CMOS after writing the flash
    pub reset_cmos: bool,
    /// Clear write protection before writing the flash
    pub disable_wp: bool,
    /// Polarity of the power LED sense line
    pub pwr_led_polarity: LedPolarity,
}

impl ModelConfig {
    /// Whether an explicit layout is declared
    pub fn has_layout(&self) -> bool {
        !self.flash_chip.layout.is_empty()
    }

    /// Render the explicit layout as a flashrom layout file
    pub fn layout_file_contents(&self) -> String {
        self.flash_chip
            .layout
            .iter()
            .map(|r| r.to_layout_line() + "\n")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enums() {
        assert_eq!("rte_1_1".parse::<Programmer>().unwrap(), Programmer::Rte1_1);
        assert!("buspirate".parse::<Programmer>().is_err());
        assert_eq!("3.3V".parse::<SpiVoltage>().unwrap(), SpiVoltage::V3_3);
        assert!(matches!(
            "5V".parse::<SpiVoltage>(),
            Err(Error::SpiWrongVoltage(v)) if v == "5V"
        ));
        assert!(matches!(
            "S3".parse::<PowerState>(),
            Err(Error::UnsupportedPowerState(s)) if s == "S3"
        ));
    }

    #[test]
    fn test_layout_region() {
        let region = LayoutRegion::parse("0x1000:0x7fffff", "bios").unwrap();
        assert_eq!(region.start, 0x1000);
        assert_eq!(region.end, 0x7F_FFFF);
        assert_eq!(region.to_layout_line(), "0x00001000:0x007fffff bios");

        assert!(LayoutRegion::parse("0x1000", "bios").is_err());
        assert!(LayoutRegion::parse("0x2000:0x1000", "bios").is_err());
        assert!(LayoutRegion::parse("0x0:0x1000", "two words").is_err());
    }
}
