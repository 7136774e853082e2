//! Model database loaded from a directory of TOML files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::types::{
    FlashChip, LayoutRegion, LedPolarity, ModelConfig, PowerControl, PowerState, Programmer,
    SpiVoltage,
};
use crate::error::{Error, Result};

/// Extension of model files
pub const MODEL_FILE_EXTENSION: &str = "toml";

// ============================================================================
// TOML deserialization types (intermediate format)
// ============================================================================

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelFile {
    programmer: ProgrammerDef,
    flash_chip: FlashChipDef,
    pwr_ctrl: PwrCtrlDef,
    #[serde(default)]
    reset_cmos: bool,
    #[serde(default)]
    disable_wp: bool,
    pwr_led: Option<PwrLedDef>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgrammerDef {
    name: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct FlashChipDef {
    voltage: String,
    model: Option<String>,
    #[serde(default)]
    layout: Vec<LayoutRegionDef>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutRegionDef {
    range: String,
    name: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PwrCtrlDef {
    sonoff: bool,
    relay: bool,
    flashing_power_state: String,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct PwrLedDef {
    polarity: String,
}

impl ModelConfig {
    /// Parse and validate a model file
    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidModel {
            model: name.to_string(),
            reason,
        };

        let file: ModelFile = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;

        let programmer: Programmer = file.programmer.name.parse()?;
        let voltage: SpiVoltage = file.flash_chip.voltage.parse()?;
        let flashing_power_state: PowerState = file.pwr_ctrl.flashing_power_state.parse()?;

        let power_control = match (file.pwr_ctrl.sonoff, file.pwr_ctrl.relay) {
            (true, false) => PowerControl::Sonoff,
            (false, true) => PowerControl::Relay,
            _ => {
                return Err(invalid(
                    "exactly one of pwr_ctrl.sonoff and pwr_ctrl.relay must be true".into(),
                ))
            }
        };

        let layout = file
            .flash_chip
            .layout
            .iter()
            .map(|r| LayoutRegion::parse(&r.range, &r.name))
            .collect::<core::result::Result<Vec<_>, _>>()
            .map_err(invalid)?;

        let pwr_led_polarity = match file.pwr_led {
            Some(led) => led.polarity.parse().map_err(invalid)?,
            None => LedPolarity::default(),
        };

        if let Some(chip) = &file.flash_chip.model {
            if chip.trim().is_empty() || chip.contains(char::is_whitespace) {
                return Err(invalid(format!("invalid flash chip model '{}'", chip)));
            }
        }

        Ok(ModelConfig {
            name: name.to_string(),
            programmer,
            flash_chip: FlashChip {
                voltage,
                model: file.flash_chip.model,
                layout,
            },
            power_control,
            flashing_power_state,
            reset_cmos: file.reset_cmos,
            disable_wp: file.disable_wp,
            pwr_led_polarity,
        })
    }
}

/// Validation outcome of one model file, for listings
#[derive(Debug)]
pub struct ModelStatus {
    /// Model name
    pub name: String,
    /// Validation error, if any
    pub error: Option<Error>,
}

impl ModelStatus {
    /// Whether the model file passed validation
    pub fn is_verified(&self) -> bool {
        self.error.is_none()
    }
}

/// Directory of model files
#[derive(Debug, Clone)]
pub struct ModelDatabase {
    dir: PathBuf,
}

impl ModelDatabase {
    /// Open a models directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The models directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", model, MODEL_FILE_EXTENSION))
    }

    /// Load and validate one model
    pub fn load(&self, model: &str) -> Result<ModelConfig> {
        if model.is_empty() || model.contains(['/', '\\']) {
            return Err(Error::UnsupportedModel(model.to_string()));
        }

        let path = self.path_for(model);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::UnsupportedModel(model.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        log::debug!("Loading model {} from {}", model, path.display());
        ModelConfig::from_toml_str(model, &content)
    }

    /// Validate every model in the directory, sorted by name
    pub fn list(&self) -> Result<Vec<ModelStatus>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MODEL_FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let error = self.load(&name).err();
                ModelStatus { name, error }
            })
            .collect())
    }
}
