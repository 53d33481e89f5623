//! Configuration file support for medtrack.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/medtrack/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the SQLite database inside the data directory
pub const DATABASE_FILE: &str = "medtrack.db";

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub palette: PaletteConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Colour swatches offered when creating a medication
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,

    #[serde(default = "default_color")]
    pub default_color: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: default_colors(),
            default_color: default_color(),
        }
    }
}

/// Report styling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_color")]
    pub header_color: String,

    #[serde(default = "default_color")]
    pub title_color: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            header_color: default_color(),
            title_color: default_color(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("medtrack")
}

fn default_color() -> String {
    "#2196F3".into()
}

fn default_colors() -> Vec<String> {
    [
        "#2196F3", "#E91E63", "#4CAF50", "#FF9800", "#9C27B0", "#F44336", "#00BCD4", "#FFEB3B",
        "#795548", "#607D8B",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("medtrack").join("config.toml")
    }

    /// Reject colours that the calendar and report could not render
    pub fn validate(&self) -> Result<()> {
        let colors = self
            .palette
            .colors
            .iter()
            .chain(std::iter::once(&self.palette.default_color))
            .chain(std::iter::once(&self.report.header_color))
            .chain(std::iter::once(&self.report.title_color));

        for color in colors {
            if !crate::types::is_hex_color(color) {
                return Err(Error::Config(format!("'{}' is not a hex colour", color)));
            }
        }
        Ok(())
    }
}
