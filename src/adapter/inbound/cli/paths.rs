//! Path utilities for modelctl.
//!
//! All host state lives under `~/.modelctl/` unless overridden:
//! - `~/.modelctl/config.toml` - settings
//! - `~/.modelctl/instances/` - instance records
//! - `~/.modelctl/locks/` - per-instance lock files

use std::path::{Path, PathBuf};

/// Returns the modelctl home directory (`~/.modelctl/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".modelctl")
}

/// Returns the default settings file path (`~/.modelctl/config.toml`).
pub fn default_settings() -> PathBuf {
    home_dir().join("config.toml")
}

/// State directory: the configured one, or the modelctl home.
pub fn state_dir(configured: Option<&Path>) -> PathBuf {
    configured.map_or_else(home_dir, Path::to_path_buf)
}
