//! CLI argument parsing

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parse a press time in whole seconds
fn parse_seconds(s: &str) -> Result<u64, String> {
    s.parse::<u64>()
        .map_err(|e| format!("Invalid number of seconds: {}", e))
}

#[derive(Parser)]
#[command(name = "rtectl")]
#[command(
    author,
    version,
    about = "Remote test harness control and DUT flashing",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level (-v, -vv). Also enables register dumps in mecheck
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the DUT models directory (contains .toml files)
    /// Defaults to looking in ./models/ and /usr/share/rtectl/models/
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Snipe-IT configuration file
    /// Defaults to snipeit.toml in the user configuration directory
    #[arg(long, global = true)]
    pub snipeit_config: Option<PathBuf>,

    /// Do not look up or check out assets in Snipe-IT
    #[arg(long, global = true)]
    pub no_registry: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Control a DUT through its RTE
    Rte(RteArgs),

    /// Control a Sonoff smart plug
    Sonoff {
        #[command(flatten)]
        target: SonoffTarget,

        #[command(subcommand)]
        command: SonoffCommands,
    },

    /// Check Intel flash descriptor regions of an image
    Mecheck(MecheckArgs),

    /// DUT model database
    #[command(subcommand)]
    Models(ModelCommands),

    /// Snipe-IT asset bookkeeping
    #[command(subcommand)]
    Snipeit(SnipeitCommands),
}

/// Options shared by all `rte` subcommands
#[derive(Args)]
pub struct RteArgs {
    /// RTE IP address
    #[arg(long)]
    pub rte_ip: String,

    /// DUT model. Queried from Snipe-IT when not given
    #[arg(long)]
    pub model: Option<String>,

    /// Sonoff IP address. Queried from Snipe-IT when not given
    #[arg(long)]
    pub sonoff_ip: Option<String>,

    /// SSH user on the RTE
    #[arg(long, default_value = "root")]
    pub ssh_user: String,

    /// SSH password on the RTE
    #[arg(long, default_value = "meta-rte")]
    pub ssh_password: String,

    #[command(subcommand)]
    pub command: RteCommands,
}

#[derive(Subcommand)]
pub enum RteCommands {
    /// Control the RTE relay
    #[command(subcommand)]
    Rel(RelayCommands),

    /// Control RTE GPIO lines
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// Control DUT power buttons
    #[command(subcommand)]
    Pwr(PowerCommands),

    /// Control the DUT power supply
    #[command(subcommand)]
    Psu(PsuCommands),

    /// Control SPI lines of the RTE
    #[command(subcommand)]
    Spi(SpiCommands),

    /// DUT flash operations
    #[command(subcommand)]
    Flash(FlashCommands),

    /// Clear the DUT CMOS
    Cmos,

    /// Read the DUT power LED
    Led,
}

#[derive(Subcommand)]
pub enum RelayCommands {
    /// Toggle relay state
    Tgl,
    /// Get relay state
    Get,
    /// Set relay state
    Set {
        /// Relay state
        state: OnOff,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum GpioCommands {
    /// Get GPIO state
    Get {
        /// GPIO number
        gpio_no: u8,
    },
    /// Set GPIO state
    Set {
        /// GPIO number
        gpio_no: u8,
        /// GPIO state (high, low, high-z)
        state: String,
    },
    /// List all GPIO states as reported by the RTE
    List,
}

#[derive(Subcommand)]
pub enum PowerCommands {
    /// Press the power button
    On {
        /// Power button press time in seconds
        #[arg(long, default_value = "1", value_parser = parse_seconds)]
        time: u64,
    },
    /// Hold the power button
    Off {
        /// Power button press time in seconds
        #[arg(long, default_value = "6", value_parser = parse_seconds)]
        time: u64,
    },
    /// Press the reset button
    Reset {
        /// Reset button press time in seconds
        #[arg(long, default_value = "1", value_parser = parse_seconds)]
        time: u64,
    },
}

#[derive(Subcommand)]
pub enum PsuCommands {
    /// Connect the power supply
    On,
    /// Disconnect the power supply
    Off,
    /// Get power supply state
    Get,
}

#[derive(Subcommand)]
pub enum SpiCommands {
    /// Enable SPI lines
    On {
        /// SPI voltage (1.8V or 3.3V), overrides the model
        #[arg(long)]
        voltage: Option<String>,
    },
    /// Disable SPI lines
    Off,
}

#[derive(Subcommand)]
pub enum FlashCommands {
    /// Probe the flash chip
    Probe,
    /// Read the flash chip to a file
    Read {
        /// Output file path
        #[arg(short, long, default_value = "read.rom")]
        rom: PathBuf,
    },
    /// Write a file to the flash chip
    Write {
        /// Input file path
        #[arg(short, long, default_value = "write.rom")]
        rom: PathBuf,

        /// Write only the BIOS region
        #[arg(long)]
        bios: bool,

        /// Write even if the image fails the region checks
        #[arg(long)]
        force: bool,
    },
    /// Erase the flash chip
    Erase,
}

/// Sonoff plug address, given directly or through the RTE it belongs to
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SonoffTarget {
    /// Sonoff IP address
    #[arg(long)]
    pub sonoff_ip: Option<String>,

    /// RTE IP address, the plug is looked up in Snipe-IT
    #[arg(long)]
    pub rte_ip: Option<String>,
}

#[derive(Subcommand)]
pub enum SonoffCommands {
    /// Turn the plug on
    On,
    /// Turn the plug off
    Off,
    /// Toggle the plug
    Tgl,
    /// Get the plug state
    Get,
}

#[derive(Args)]
pub struct MecheckArgs {
    /// Flash image to check
    pub image: Option<PathBuf>,

    /// Check that a region is present and holds data (repeatable)
    #[arg(short, long = "check", value_name = "REGION")]
    pub check: Vec<String>,

    /// Dump a region to <REGION>_dump.bin (repeatable)
    #[arg(short, long = "dump", value_name = "REGION")]
    pub dump: Vec<String>,

    /// Dry run, always exit with status 0
    #[arg(short = 'x', long)]
    pub dry_run: bool,

    /// List known region names
    #[arg(short, long)]
    pub list: bool,
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// List models and whether they pass validation
    List,
    /// Show the parsed configuration of a model
    Show {
        /// Model name
        model: String,
    },
}

/// Asset selector for Snipe-IT commands
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct AssetSelector {
    /// Asset ID
    #[arg(long)]
    pub asset_id: Option<u64>,

    /// RTE IP of the asset
    #[arg(long)]
    pub rte_ip: Option<String>,
}

#[derive(Subcommand)]
pub enum SnipeitCommands {
    /// Check an asset out to the configured user
    CheckOut(AssetSelector),
    /// Check an asset in
    CheckIn(AssetSelector),
}
