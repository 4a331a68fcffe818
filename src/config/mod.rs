// Configuration module
// Author: json2sheet contributors

mod models;

pub use models::*;

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, `JSON2SHEET_SECTION__KEY`)
    /// 2. Config file (`path`, or `~/.json2sheet/config.toml`)
    /// 3. Defaults (lowest)
    ///
    /// CLI overrides are applied by the caller afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            // Load from config file if it exists
            .add_source(File::from(config_path).required(false))
            .add_source(
                Environment::with_prefix("JSON2SHEET")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        if app_config.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
                app_config.gemini.api_key = key;
            }
        }

        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(AppError::Config(
                "cache.max_entries must be greater than zero".to_string(),
            ));
        }
        if self.cache.default_ttl_seconds == 0 {
            return Err(AppError::Config(
                "cache.default_ttl_seconds must be greater than zero".to_string(),
            ));
        }
        if self.cache.cleanup_interval_seconds == 0 {
            return Err(AppError::Config(
                "cache.cleanup_interval_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".json2sheet")
            .join("config.toml")
    }
}
