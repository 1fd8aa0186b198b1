//! Configuration file resolution and TOML loading
//!
//! Config file lookup follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config file (`~/.config/pirad/config.toml`)
//! 4. System config file (`/etc/pirad/config.toml`)
//! 5. Compiled defaults (fallback)
//!
//! A missing config file is not an error: the caller gets defaults and a
//! warning is logged. A file that was explicitly requested (steps 1-2) must
//! exist, and any file that is found must parse.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PIRAD_CONFIG";

/// Config file chosen by [`resolve_config_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// Path of the TOML file
    pub path: PathBuf,
    /// True when the path came from the command line or environment
    pub explicit: bool,
}

/// Resolve the config file path
///
/// Returns `None` when no explicit path was given and neither the user nor
/// the system config file exists.
pub fn resolve_config_file(cli_arg: Option<&Path>, env_var_name: &str) -> Option<ConfigLocation> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(ConfigLocation {
            path: path.to_path_buf(),
            explicit: true,
        });
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(ConfigLocation {
                path: PathBuf::from(path),
                explicit: true,
            });
        }
    }

    // Priority 3/4: well-known locations
    default_config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map(|path| ConfigLocation {
            path,
            explicit: false,
        })
}

/// Well-known config file locations, most specific first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("pirad").join("config.toml"));
    }
    paths.push(PathBuf::from("/etc/pirad/config.toml"));
    paths
}

/// Load a TOML config, falling back to `T::default()` when no file exists
pub fn load_toml<T>(location: Option<&ConfigLocation>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(location) = location else {
        warn!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    if !location.path.exists() {
        if location.explicit {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                location.path.display()
            )));
        }
        warn!(
            "Config file {} disappeared, using built-in defaults",
            location.path.display()
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(&location.path)?;
    let config = toml::from_str(&content)?;
    info!("Loaded config from {}", location.path.display());
    Ok(config)
}
