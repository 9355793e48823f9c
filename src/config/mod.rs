// file: src/config/mod.rs
// version: 1.0.0
// guid: 5b9e1d47-8c30-4a62-bf15-d074e2a8c396

//! Configuration module for fyrd
//!
//! Handles the sectioned config file (`~/.fyrd/config.toml` by default) and
//! the named submission profiles stored at the configured `profile_file`.

pub mod profiles;
pub mod settings;

pub use profiles::{Profile, ProfileStore};
pub use settings::{FyrdConfig, JobsSection, LocalSection, QueueSection};

use crate::Result;
use std::path::PathBuf;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "FYRD_CONFIG";

/// Resolve the config file path.
///
/// `FYRD_CONFIG` wins, then an explicit `--config` path, then
/// `~/.fyrd/config.toml`.
pub fn config_path(explicit: Option<&std::path::Path>) -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(expand_path(&path));
    }
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let home = dirs::home_dir()
        .ok_or_else(|| crate::error::FyrdError::config("Could not determine home directory"))?;
    Ok(home.join(".fyrd").join("config.toml"))
}

/// Expand `~` and environment variables in a path string
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}
