//! Driver settings using Figment.
//!
//! Settings are loaded from:
//! 1. `config/rgbled.toml` (base configuration)
//! 2. Environment variables (prefixed with `RGBLED_`, sections split on `__`)
//!
//! Every section has defaults, so a missing file yields a usable
//! configuration.
//!
//! # Example
//! ```no_run
//! use rgbled::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("max LEDs per device: {}", settings.driver.max_resources);
//! # Ok::<(), figment::Error>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::driver::{COMPATIBLE, MAX_RESOURCES};

/// Default settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/rgbled.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "RGBLED_";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Driver settings
    #[serde(default)]
    pub driver: DriverSettings,
    /// Simulated line bank
    #[serde(default)]
    pub lines: LineSettings,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSettings {
    /// Maximum LEDs per device
    #[serde(default = "default_max_resources")]
    pub max_resources: usize,
    /// Compatible strings the driver binds to
    #[serde(default = "default_compatible")]
    pub compatible: Vec<String>,
}

/// Simulated line controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSettings {
    /// Number of lines in the bank
    #[serde(default = "default_line_count")]
    pub count: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_resources() -> usize {
    MAX_RESOURCES
}

fn default_compatible() -> Vec<String> {
    COMPATIBLE.iter().map(|s| s.to_string()).collect()
}

fn default_line_count() -> u32 {
    28
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            max_resources: default_max_resources(),
            compatible: default_compatible(),
        }
    }
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            count: default_line_count(),
        }
    }
}

impl Settings {
    /// Load settings from `config/rgbled.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `RGBLED_`.
    /// Example: `RGBLED_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load settings from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate settings after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            ));
        }

        if self.driver.max_resources == 0 {
            return Err("Invalid max_resources 0. Must be at least 1".to_string());
        }

        if self.driver.compatible.iter().all(|c| c.trim().is_empty()) {
            return Err("Driver compatible list must contain at least one entry".to_string());
        }

        if self.lines.count == 0 {
            return Err("Invalid line count 0. Must be at least 1".to_string());
        }

        Ok(())
    }
}
