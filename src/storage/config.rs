//! JSON Configuration Management
//!
//! Reads and writes the analyzer configuration file. Configuration is validated
//! on both load and save, so an invalid file never reaches the orchestrator.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::models::settings::AnalyzerConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// File-backed store for `AnalyzerConfig`
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (~/.recap/config.json)
    pub fn default_location() -> AppResult<Self> {
        Ok(Self::new(config_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and validate the configuration file
    pub fn load(&self) -> AppResult<AnalyzerConfig> {
        let content = fs::read_to_string(&self.path)?;
        let config: AnalyzerConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::configuration)?;
        debug!("Loaded analyzer config from {}", self.path.display());
        Ok(config)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default(&self) -> AppResult<AnalyzerConfig> {
        if self.path.exists() {
            self.load()
        } else {
            info!(
                "No config at {}, using defaults",
                self.path.display()
            );
            Ok(AnalyzerConfig::default())
        }
    }

    /// Validate and save with pretty formatting. The API key is never written.
    pub fn save(&self, config: &AnalyzerConfig) -> AppResult<()> {
        config.validate().map_err(AppError::configuration)?;
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let mut stored = config.clone();
        stored.provider.api_key = None;
        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
