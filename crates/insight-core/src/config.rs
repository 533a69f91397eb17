//! Configuration system for Insight trace analysis
//!
//! Provides:
//! - Config file discovery (CLI flag, env var, standard paths)
//! - TOML parsing with serde
//! - Environment variable overrides
//! - Validation

use crate::color::DEFAULT_PALETTE;
use crate::operation::types;
use crate::tokens::TokenNames;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Complete analyzer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Logging settings
    pub logging: LoggingSettings,

    /// Correlation token header names
    pub tokens: TokenNames,

    /// Analysis settings
    pub analysis: AnalysisSettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Operation types treated as outbound HTTP calls
    pub operation_types: Vec<String>,

    /// Colour palette (empty = no colours)
    pub colors: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            operation_types: vec![
                types::HTTP_CLIENT.to_string(),
                types::SPRING_REST_TEMPLATE.to_string(),
            ],
            colors: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Path to config file (if specified via CLI)
    cli_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self { cli_path: None }
    }

    /// Set the config path from CLI argument
    pub fn with_cli_path(mut self, path: Option<PathBuf>) -> Self {
        self.cli_path = path;
        self
    }

    /// Load configuration with the following precedence:
    /// 1. CLI --config flag
    /// 2. INSIGHT_CONFIG environment variable
    /// 3. ~/.config/insight/config.toml
    /// 4. /etc/insight/config.toml
    /// 5. Default values
    pub fn load(&self) -> ConfigResult<AnalyzerConfig> {
        let mut config = match self.find_config_file() {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)?
            }
            None => {
                debug!("No config file found, using defaults");
                AnalyzerConfig::default()
            }
        };

        Self::apply_env_overrides(&mut config);
        Self::validate(&config)?;

        Ok(config)
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!("CLI config path does not exist: {}", path.display());
        }

        if let Ok(env_path) = std::env::var("INSIGHT_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            warn!("INSIGHT_CONFIG path does not exist: {}", env_path);
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        #[cfg(unix)]
        {
            let path = PathBuf::from("/etc/insight/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<AnalyzerConfig> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: AnalyzerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(config: &mut AnalyzerConfig) {
        if let Ok(val) = std::env::var("INSIGHT_LOG_LEVEL") {
            config.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_APP_TOKEN_HEADER") {
            config.tokens.application = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_SERVER_TOKEN_HEADER") {
            config.tokens.server = val;
        }
        if let Ok(val) = std::env::var("INSIGHT_ENDPOINT_TOKEN_HEADER") {
            config.tokens.endpoint = val;
        }
    }

    /// Validate configuration
    pub fn validate(config: &AnalyzerConfig) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.logging.log_level, valid_levels
            )));
        }

        let tokens = &config.tokens;
        let names = [&tokens.application, &tokens.server, &tokens.endpoint];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Token header names cannot be empty".to_string(),
            ));
        }
        for (i, a) in names.iter().enumerate() {
            if names[i + 1..].iter().any(|b| a.eq_ignore_ascii_case(b)) {
                return Err(ConfigError::ValidationError(format!(
                    "Token header name used twice: {}",
                    a
                )));
            }
        }

        if config.analysis.operation_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one operation type is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Render configuration as TOML
    pub fn to_toml(config: &AnalyzerConfig) -> ConfigResult<String> {
        toml::to_string_pretty(config).map_err(|e| {
            ConfigError::ValidationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Save configuration to a file
    pub fn save(config: &AnalyzerConfig, path: &Path) -> ConfigResult<()> {
        let content = Self::to_toml(config)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Get the default config file path for the current platform
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("insight").join("config.toml"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper module for platform-specific directories
mod dirs {
    use std::path::PathBuf;

    /// Get the user's config directory
    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        }

        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }

        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
