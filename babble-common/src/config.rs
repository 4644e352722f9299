//! Configuration loading and named value resolution
//!
//! Named values (API credentials, asset paths) resolve with priority:
//! 1. Process environment
//! 2. `[variables]` table of the TOML config file
//!
//! A value that is absent or blank in every source is reported as
//! [`Error::ConfigMissing`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable that points at an explicit config file
pub const CONFIG_PATH_ENV: &str = "BABBLE_CONFIG";

/// Config file looked up in the working directory as a last resort
const LOCAL_CONFIG_FILE: &str = "babble.toml";

/// Contents of the babble TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named values, e.g. `SPOTIFY_CLIENT_ID = "..."`
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }
}

/// Locate the config file: `$BABBLE_CONFIG`, then the platform config
/// directory (`<config_dir>/babble/config.toml`), then `./babble.toml`.
pub fn locate_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("babble").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    None
}

/// Resolves named configuration values from the environment and the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    toml: TomlConfig,
}

impl ConfigResolver {
    pub fn new(toml: TomlConfig) -> Self {
        Self { toml }
    }

    /// Load the config file if one can be found.
    ///
    /// A missing file is not an error; an unreadable or malformed one falls
    /// back to defaults with a warning.
    pub fn load() -> Self {
        Self::or_default(Self::try_load())
    }

    /// Load the config file, reporting an unreadable, malformed or missing
    /// explicit file as [`Error::Config`].
    ///
    /// Binaries call this before logging is installed and hand the result to
    /// [`ConfigResolver::or_default`] afterwards, so the warning is not lost.
    pub fn try_load() -> Result<Self> {
        let toml = match locate_config_file() {
            Some(path) if path.exists() => {
                let config = TomlConfig::from_file(&path)?;
                debug!("Loaded config file {}", path.display());
                config
            }
            Some(path) => {
                return Err(Error::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )))
            }
            None => TomlConfig::default(),
        };
        Ok(Self { toml })
    }

    /// Fall back to defaults on a failed load, with a warning.
    pub fn or_default(loaded: Result<Self>) -> Self {
        loaded.unwrap_or_else(|e| {
            warn!("Ignoring config file, using defaults: {}", e);
            Self::default()
        })
    }

    /// Log level of a load result, the default level if it failed
    pub fn log_level(loaded: &Result<Self>) -> String {
        match loaded {
            Ok(config) => config.toml.logging.level.clone(),
            Err(_) => default_log_level(),
        }
    }

    pub fn toml(&self) -> &TomlConfig {
        &self.toml
    }

    /// Resolve a required value
    pub fn get(&self, name: &str) -> Result<String> {
        self.get_optional(name)
            .ok_or_else(|| Error::ConfigMissing(name.to_string()))
    }

    /// Resolve a value, `None` if absent or blank everywhere
    pub fn get_optional(&self, name: &str) -> Option<String> {
        if let Ok(value) = std::env::var(name) {
            if is_valid_value(&value) {
                return Some(value);
            }
        }

        self.toml
            .variables
            .get(name)
            .filter(|value| is_valid_value(value))
            .cloned()
    }
}

/// Resolve a required value using the default config file lookup
pub fn get_env_variable(name: &str) -> Result<String> {
    ConfigResolver::load().get(name)
}

/// Non-empty, non-whitespace
fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}
