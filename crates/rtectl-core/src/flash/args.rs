//! flashrom command line construction

use crate::model::{ModelConfig, Programmer};

/// Remote path firmware images are uploaded to
pub const FW_PATH_WRITE: &str = "/data/write.rom";
/// Remote path flashrom reads the chip into
pub const FW_PATH_READ: &str = "/tmp/read.rom";
/// Remote path of the generated layout file
pub const LAYOUT_PATH: &str = "/tmp/layout.txt";

/// flashrom driver for the RTE SPI header
pub const PROGRAMMER_RTE: &str = "linux_spi:dev=/dev/spidev1.0,spispeed=16000";
/// flashrom driver for a CH341A attached to the RTE
pub const PROGRAMMER_CH341A: &str = "ch341a_spi";
/// flashrom driver for a Dediprog attached to the RTE
pub const PROGRAMMER_DEDIPROG: &str = "dediprog";

/// flashrom driver string for a programmer
pub fn flashrom_programmer(programmer: Programmer) -> &'static str {
    match programmer {
        Programmer::Ch341a => PROGRAMMER_CH341A,
        Programmer::Dediprog => PROGRAMMER_DEDIPROG,
        Programmer::Rte1_1 | Programmer::Rte1_0 => PROGRAMMER_RTE,
    }
}

/// One flashrom invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    /// Probe the chip only
    Probe,
    /// Read the chip into [`FW_PATH_READ`]
    Read,
    /// Erase the chip
    Erase,
    /// Write [`FW_PATH_WRITE`], optionally restricted to the BIOS region
    Write {
        /// Only write the `bios` region
        bios_only: bool,
    },
    /// Clear write protection over the whole chip
    DisableWp,
}

impl FlashOp {
    /// Whether the op expects an uploaded image
    pub fn needs_image(self) -> bool {
        matches!(self, FlashOp::Write { .. })
    }

    /// Whether the op leaves a file to download
    pub fn produces_image(self) -> bool {
        self == FlashOp::Read
    }

    /// flashrom arguments for this op on `model`
    pub fn args(self, model: &ModelConfig) -> String {
        let mut args: Vec<&str> = Vec::new();

        if let Some(chip) = &model.flash_chip.model {
            args.extend(["-c", chip.as_str()]);
        }

        match self {
            FlashOp::Probe => {}
            FlashOp::Read => args.extend(["-r", FW_PATH_READ]),
            FlashOp::Erase => args.push("-E"),
            FlashOp::Write { bios_only } => {
                if bios_only {
                    args.extend(["-i", "bios"]);
                    if model.has_layout() {
                        args.extend(["--layout", LAYOUT_PATH]);
                    } else {
                        args.push("--ifd");
                    }
                }
                args.extend(["-w", FW_PATH_WRITE]);
            }
            FlashOp::DisableWp => args.extend(["--wp-disable", "--wp-range=0x0,0x0"]),
        }

        args.join(" ")
    }

    /// Full remote command line
    pub fn command(self, model: &ModelConfig) -> String {
        let programmer = flashrom_programmer(model.programmer);
        let args = self.args(model);
        if args.is_empty() {
            format!("flashrom -p {}", programmer)
        } else {
            format!("flashrom -p {} {}", programmer, args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LayoutRegion;
    use crate::testing::model;

    #[test]
    fn test_programmer_mapping() {
        let m = model("ch341a", "3.3V", "G3", "");
        assert_eq!(FlashOp::Probe.command(&m), "flashrom -p ch341a_spi");
        let m = model("dediprog", "3.3V", "G3", "");
        assert_eq!(FlashOp::Erase.command(&m), "flashrom -p dediprog -E");
        let m = model("rte_1_0", "3.3V", "G3", "");
        assert_eq!(
            FlashOp::Read.command(&m),
            "flashrom -p linux_spi:dev=/dev/spidev1.0,spispeed=16000 -r /tmp/read.rom"
        );
    }

    #[test]
    fn test_chip_override_comes_first() {
        let mut m = model("rte_1_1", "3.3V", "G3", "");
        m.flash_chip.model = Some("MX25L6405D".into());
        assert_eq!(
            FlashOp::Write { bios_only: false }.args(&m),
            "-c MX25L6405D -w /data/write.rom"
        );
        assert_eq!(
            FlashOp::DisableWp.args(&m),
            "-c MX25L6405D --wp-disable --wp-range=0x0,0x0"
        );
    }

    #[test]
    fn test_bios_only_write() {
        let mut m = model("rte_1_1", "3.3V", "G3", "");
        assert_eq!(
            FlashOp::Write { bios_only: true }.args(&m),
            "-i bios --ifd -w /data/write.rom"
        );

        m.flash_chip.layout = vec![LayoutRegion::parse("0x1000:0xffffff", "bios").unwrap()];
        assert_eq!(
            FlashOp::Write { bios_only: true }.args(&m),
            "-i bios --layout /tmp/layout.txt -w /data/write.rom"
        );
    }
}
