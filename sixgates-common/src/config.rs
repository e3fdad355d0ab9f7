//! Configuration management for the Six Gates screener.
//!
//! The screener reads a single configuration file at `~/.sixgates/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `FMP_API_KEY` → providers.fmp.api_key
//! - `FMP_BASE_URL` → providers.fmp.base_url
//! - `ANTHROPIC_API_KEY` → providers.llm.api_key
//! - `ANTHROPIC_MODEL` → providers.llm.model
//! - `SIXGATES_LOG_LEVEL` → observability.log_level
//! - `SIXGATES_LOG_FORMAT` → observability.log_format

use crate::error::{Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::thresholds::ThresholdsConfig;
use crate::validation::Validate;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sixgates"),
        |dirs| dirs.home_dir().join(".sixgates"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Gate, tier, market and sizing thresholds
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load, apply env overrides and validate thresholds.
    pub fn load_and_validate() -> Result<Self> {
        let config = Self::load_with_env()?;
        config.thresholds.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("FMP_API_KEY") {
            self.providers.fmp.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("FMP_BASE_URL") {
            self.providers.fmp.base_url = url;
        }
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.providers.llm.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            self.providers.llm.model = model;
        }
        if let Ok(level) = std::env::var("SIXGATES_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SIXGATES_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Save configuration to the given path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .context(format!("Failed to create config directory {}", dir.display()))?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))
    }
}

// ============================================================================
// Observability
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// External Providers
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub fmp: FmpConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Financial Modeling Prep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FmpConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_fmp_base_url")]
    pub base_url: String,
    #[serde(default = "default_fmp_timeout")]
    pub timeout_secs: u64,
}

impl Default for FmpConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_fmp_base_url(),
            timeout_secs: default_fmp_timeout(),
        }
    }
}

fn default_fmp_base_url() -> String {
    "https://financialmodelingprep.com/stable".to_string()
}

fn default_fmp_timeout() -> u64 {
    30
}

/// Text-generation collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_api_version")]
    pub api_version: String,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Total attempts including the first one
    #[serde(default = "default_llm_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit: attempt N waits `backoff_ms * N`
    #[serde(default = "default_llm_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_version: default_llm_api_version(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_attempts: default_llm_attempts(),
            backoff_ms: default_llm_backoff_ms(),
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_llm_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_llm_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_llm_max_tokens() -> u32 {
    2000
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_attempts() -> u32 {
    3
}

fn default_llm_backoff_ms() -> u64 {
    1000
}
