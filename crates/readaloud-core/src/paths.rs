//! Configuration path resolution.
//!
//! Resolution order:
//! 1. `READALOUD_CONFIG_DIR` environment variable (highest priority)
//! 2. System config directory (e.g., `~/.config/readaloud`)

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable that overrides the configuration directory.
pub const CONFIG_DIR_ENV: &str = "READALOUD_CONFIG_DIR";

const APP_DIR: &str = "readaloud";
const PREFERENCES_FILE: &str = "preferences.json";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system config directory.
    #[error("Cannot determine system config directory")]
    NoConfigDir,

    /// An empty override was provided.
    #[error("Path cannot be empty")]
    EmptyPath,
}

/// Root directory for persisted preferences.
pub fn config_root() -> Result<PathBuf, PathError> {
    resolve_config_root(env::var(CONFIG_DIR_ENV).ok().as_deref(), dirs::config_dir())
}

/// Location of the preferences JSON file.
pub fn preferences_path() -> Result<PathBuf, PathError> {
    Ok(config_root()?.join(PREFERENCES_FILE))
}

fn resolve_config_root(
    env_override: Option<&str>,
    system: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(raw) = env_override {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::EmptyPath);
        }
        return Ok(expand_home(Path::new(trimmed)));
    }

    system
        .map(|dir| dir.join(APP_DIR))
        .ok_or(PathError::NoConfigDir)
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
