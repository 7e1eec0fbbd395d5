//! Livechat CLI Configuration Management
//!
//! Configuration is read from a TOML file, either the one given with
//! `--config` or `livechat.toml` in the user's config directory when it
//! exists. Command line flags are applied on top of the file. Missing keys
//! fall back to defaults, so a file only needs the values it changes.

use std::path::{Path, PathBuf};

use livechat_core::{DisplayLimit, SessionConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CliError, Result};

/// File name looked up in the user's config directory
pub const CONFIG_FILE_NAME: &str = "livechat.toml";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the livechat CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connection and feed settings
    pub session: SessionConfig,
    /// Terminal output settings
    pub display: DisplayConfig,
}

/// How messages are printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Messages shown when the view is (re)printed
    pub limit: DisplayLimit,
    /// Prefix lines with the message time
    pub show_timestamps: bool,
    /// Show source, role and place markers before the author
    pub show_decorations: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            limit: DisplayLimit::Recent(50),
            show_timestamps: true,
            show_decorations: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load from an explicit path, else the default location, else defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            info!("Loading configuration from: {}", path);
            return Self::load_from_file(path);
        }

        match Self::default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)
            }
            _ => {
                info!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a TOML configuration file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// `<config dir>/livechat/livechat.toml` when a config dir exists
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("livechat").join(CONFIG_FILE_NAME))
    }

    /// Apply command line flags on top of the file values
    pub fn with_overrides(mut self, server: Option<String>, limit: Option<DisplayLimit>) -> Self {
        if let Some(server) = server {
            self.session.server_url = server;
        }
        if let Some(limit) = limit {
            self.display.limit = limit;
        }
        self
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|error| CliError::Config(error.to_string()))
    }

    /// Sample configuration file contents
    pub fn example_config() -> String {
        let example = AppConfig {
            session: SessionConfig {
                feed: livechat_core::FeedConfig::bounded(5000),
                ..SessionConfig::default()
            },
            display: DisplayConfig {
                limit: DisplayLimit::Recent(100),
                ..DisplayConfig::default()
            },
        };

        let body = toml::to_string_pretty(&example).unwrap_or_default();
        format!(
            "# livechat configuration\n\
             # Durations are in milliseconds. Remove a key to use its default.\n\n{}",
            body
        )
    }
}
