//! rtectl - Remote test harness control
//!
//! Drives a DUT through an RTE (Remote Testing Environment) board: GPIO
//! lines for the power and reset buttons, a relay or Sonoff plug for the
//! power supply and SPI lines for external flashing with flashrom running
//! on the harness.
//!
//! # Architecture
//!
//! All sequencing lives in `rtectl-core` and is transport agnostic. This
//! binary wires it to the real transports:
//! - **HTTP** (`rtectl-http`) - RTE GPIO REST API, Sonoff plugs, Snipe-IT
//! - **SSH** (`rtectl-ssh`) - file transfer and flashrom execution
//!
//! Per-DUT behaviour comes from the model database, a directory of TOML
//! files (see `models/`).

mod cli;
mod commands;
mod progress;

use clap::Parser;
use cli::{Cli, Commands, ModelCommands, SnipeitCommands};
use commands::Registry;
use rtectl_core::model::ModelDatabase;
use rtectl_http::{SnipeIt, SnipeItConfig};
use std::path::{Path, PathBuf};

/// Name of the Snipe-IT configuration file in the user config directory
const SNIPEIT_CONFIG_FILE: &str = "snipeit.toml";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match &cli.command {
        Commands::Mecheck(args) => commands::mecheck::run(args, cli.verbose > 0),
        Commands::Models(cmd) => {
            let db = open_models(cli.models_dir.as_deref());
            match cmd {
                ModelCommands::List => commands::models::cmd_list(&db),
                ModelCommands::Show { model } => commands::models::cmd_show(&db, model),
            }
            .map(|()| 0)
        }
        Commands::Rte(args) => {
            let db = open_models(cli.models_dir.as_deref());
            let mut registry = open_registry(&cli);
            commands::rte::run(args, &db, registry.as_mut())
        }
        Commands::Sonoff { target, command } => {
            let mut registry = open_registry(&cli);
            commands::sonoff::run(target, command, registry.as_mut()).map(|()| 0)
        }
        Commands::Snipeit(cmd) => {
            let Some(mut registry) = open_registry(&cli) else {
                eprintln!("No Snipe-IT configuration found");
                std::process::exit(1);
            };
            match cmd {
                SnipeitCommands::CheckOut(selector) => {
                    commands::snipeit::cmd_check_out(&mut registry, selector)
                }
                SnipeitCommands::CheckIn(selector) => {
                    commands::snipeit::cmd_check_in(&mut registry, selector)
                }
            }
            .map(|()| 0)
        }
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Locate the models directory from the given path or default locations
fn find_models_dir(path: Option<&Path>, defaults: &[PathBuf]) -> Result<PathBuf, String> {
    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
        return Err(format!("Models directory not found: {}", path.display()));
    }

    match defaults.iter().find(|dir| dir.is_dir()) {
        Some(dir) => {
            log::debug!("Using models from {}", dir.display());
            Ok(dir.clone())
        }
        None => {
            log::warn!("No models directory found in default locations");
            Ok(defaults.first().cloned().unwrap_or_default())
        }
    }
}

/// Open the model database, exiting on an explicit but missing directory
fn open_models(path: Option<&Path>) -> ModelDatabase {
    let defaults = [
        PathBuf::from("models"),
        PathBuf::from("/usr/share/rtectl/models"),
        PathBuf::from("/usr/local/share/rtectl/models"),
    ];
    match find_models_dir(path, &defaults) {
        Ok(dir) => ModelDatabase::new(dir),
        Err(e) => {
            eprintln!("Failed to open model database: {}", e);
            std::process::exit(1);
        }
    }
}

/// Default location of the Snipe-IT configuration
fn default_snipeit_config() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "rtectl")
        .map(|dirs| dirs.config_dir().join(SNIPEIT_CONFIG_FILE))
}

/// Connect the asset registry unless disabled
///
/// A missing default configuration means no registry. An explicitly given
/// configuration that cannot be loaded is fatal.
fn open_registry(cli: &Cli) -> Option<Registry> {
    if cli.no_registry {
        log::debug!("Asset registry disabled");
        return None;
    }

    let path = match &cli.snipeit_config {
        Some(path) => path.clone(),
        None => match default_snipeit_config() {
            Some(path) if path.is_file() => path,
            _ => {
                log::debug!("No Snipe-IT configuration, running without asset registry");
                return None;
            }
        },
    };

    match SnipeItConfig::from_file(&path) {
        Ok(config) => {
            log::debug!("Loaded Snipe-IT configuration from {}", path.display());
            Some(Box::new(SnipeIt::new(config)))
        }
        Err(e) => {
            eprintln!("Failed to load Snipe-IT configuration: {}", e);
            std::process::exit(1);
        }
    }
}
