//! Configuration file resolution and TOML loading
//!
//! Resolution priority:
//! 1. Explicit path supplied by the embedding application
//! 2. `SEGUE_CONFIG` environment variable
//! 3. `<user config dir>/segue/segue.toml`
//! 4. Compiled defaults (no file)
//!
//! A missing configuration file is never fatal: the loader logs a warning and
//! falls back to defaults. A file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "SEGUE_CONFIG";

/// Configuration file name inside the user config directory
pub const CONFIG_FILE_NAME: &str = "segue.toml";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves which configuration file (if any) should be loaded
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    explicit_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that prefers an explicit path over every other source
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit_path: Some(path.into()),
        }
    }

    /// Resolve the configuration path
    ///
    /// Returns `None` when no source names a file, in which case compiled
    /// defaults apply. The user config directory is only returned if the file
    /// exists there.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_path().filter(|p| p.exists())
    }
}

/// `<user config dir>/segue/segue.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("segue").join(CONFIG_FILE_NAME))
}

/// Load a TOML configuration, degrading to defaults when the file is absent
///
/// # Errors
/// - `Error::Io` if the file exists but cannot be read
/// - `Error::Config` if the file cannot be parsed
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match path {
        Some(path) => path,
        None => {
            info!("No configuration file found, using built-in defaults");
            return Ok(T::default());
        }
    };

    if !path.exists() {
        warn!(
            "Configuration file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}
