//! Cross-Platform Path Utilities
//!
//! Resolves the analyzer's home directory (~/.recap/) and the files in it.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::configuration("Could not determine home directory"))
}

/// Get the Recap directory (~/.recap/)
pub fn recap_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".recap"))
}

/// Get the config file path (~/.recap/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(recap_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
