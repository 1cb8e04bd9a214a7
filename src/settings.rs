//! Code for loading program settings.
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Program settings from config file
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Options passed on to the optimisation engine
    #[serde(default)]
    pub solver: SolverSettings,
    /// Options controlling how the building is compiled into a problem
    #[serde(default)]
    pub compile: CompileSettings,
}

/// Options for the optimisation engine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverSettings {
    /// Wall-clock limit for a solve, in seconds
    pub time_limit: Option<f64>,
    /// Relative MIP optimality gap at which to stop
    pub mip_rel_gap: Option<f64>,
    /// Constant used for big-M rows when variable bounds do not give a finite value
    pub big_m: f64,
    /// Whether the engine may print its own log to the console
    pub log_to_console: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit: None,
            mip_rel_gap: None,
            big_m: 1e7,
            log_to_console: true,
        }
    }
}

/// Options for compiling a building into a problem
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompileSettings {
    /// Smallest size counted as "installed" in disjunctions, used in place of a zero minimum size
    pub size_epsilon: f64,
    /// Number of constant-price segments each operate-subsidy bracket is split into
    pub tariff_segments: usize,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            size_epsilon: 0.01,
            tariff_segments: 4,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            solver: SolverSettings::default(),
            compile: CompileSettings::default(),
        }
    }
}

impl Settings {
    /// Read the settings file from the model directory.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load(model_dir: &Path) -> Result<Settings> {
        Self::load_from_path(&model_dir.join(SETTINGS_FILE_NAME))
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }
}
