//! Configuration file discovery and TOML loading
//!
//! Config file resolution order:
//! 1. Explicit path (command-line `--config`)
//! 2. User config: `<config_dir>/<app>/config.toml`
//! 3. System config: `/etc/<app>/config.toml` (Linux only)
//!
//! A missing file is not an error: callers fall back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locate the configuration file for `app_name`
///
/// Returns the explicit path when given (even if it does not exist, so the
/// caller gets a clear error), otherwise the first existing platform path.
pub fn find_config_file(explicit: Option<&Path>, app_name: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let user_config = dirs::config_dir().map(|d| d.join(app_name).join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            debug!("Found user config file: {}", path.display());
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(app_name).join("config.toml");
        if system_config.exists() {
            debug!("Found system config file: {}", system_config.display());
            return Some(system_config);
        }
    }

    None
}

/// Read and deserialize a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}
