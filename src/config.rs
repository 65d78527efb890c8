//! Application configuration.
//!
//! Settings are read from an optional TOML file and can be overridden with
//! environment variables of the form `ERRCHAIN__<SECTION>__<KEY>`, for example
//! `ERRCHAIN__DISPLAY__COLOR=false`.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::logging::{LogLevel, LoggingConfig};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "ERRCHAIN";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The configuration file path is invalid.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: LogLevel,
    pub timestamps: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            timestamps: false,
        }
    }
}

impl LoggingSection {
    /// Builds the subscriber configuration, letting `-v` flags raise the level.
    pub fn to_logging_config(&self, verbosity: u8) -> LoggingConfig {
        let level = if verbosity > 0 {
            LogLevel::from(verbosity - 1)
        } else {
            self.level
        };
        LoggingConfig::new()
            .with_level(level)
            .with_timestamps(self.timestamps)
            .with_target(false)
    }
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// Always print the debug payload after the user message.
    pub verbose: bool,
    /// Colorize terminal output.
    pub color: bool,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            verbose: false,
            color: true,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingSection,
    pub display: DisplaySection,
}

impl AppConfig {
    /// Load configuration from a TOML file with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file does not exist
    /// - The configuration file cannot be parsed
    /// - The path is invalid
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use errchain::config::AppConfig;
    ///
    /// let config = AppConfig::load("errchain.toml")?;
    /// # Ok::<(), errchain::config::ConfigError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(env_source())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load from `path` when given, otherwise from defaults plus environment overrides.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Config::builder().add_source(env_source()).build()?;
                Ok(config.try_deserialize()?)
            }
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
