//! Configuration management for GrammaFixer
//!
//! Handles loading and parsing of `grammafixer.toml` configuration file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::i18n::TranslationSource;
use crate::quota::DEFAULT_DAILY_LIMIT;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Correction API settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Usage limits
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// UI language settings
    #[serde(default)]
    pub i18n: I18nConfig,
}

/// Correction API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key (can also be set via environment variable)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model name (e.g., "gemini-pro")
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Seconds to wait for a response before giving up
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum tokens for response
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Free corrections per calendar day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Maximum number of stored history entries
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Directory holding the user and history records
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct I18nConfig {
    /// Initial UI language when none has been chosen yet
    #[serde(default)]
    pub language: Option<String>,

    /// Directory with `<code>.json` translation tables, instead of the bundled ones
    #[serde(default)]
    pub locales_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &PathBuf) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", "grammafixer")
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("grammafixer.toml"))
    }

    /// Load configuration from default path or workspace
    pub fn load_from_default() -> Self {
        // Try workspace path first
        let workspace_path = PathBuf::from("grammafixer.toml");
        if workspace_path.exists() {
            match Self::load(&workspace_path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring invalid grammafixer.toml: {}", e),
            }
        }

        // Try user config directory
        if let Some(default_path) = Self::default_path() {
            if let Ok(config) = Self::load(&default_path) {
                return config;
            }
        }

        Config::default()
    }

    /// Get the effective API key (from config or environment)
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.llm.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }

        std::env::var("GEMINI_API_KEY").ok().filter(|key| !key.is_empty())
    }

    /// Get the effective model name
    pub fn get_model(&self) -> String {
        self.llm.model.clone().unwrap_or_else(|| "gemini-pro".to_string())
    }

    /// Get the effective API base URL
    pub fn get_base_url(&self) -> String {
        self.llm
            .base_url
            .clone()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string())
    }

    /// Check if the correction API can be called
    pub fn is_llm_enabled(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Directory for persisted records, if one can be determined
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage
            .data_dir
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
    }

    /// Where UI strings are read from
    pub fn translation_source(&self) -> TranslationSource {
        match &self.i18n.locales_dir {
            Some(dir) => TranslationSource::Directory(dir.clone()),
            None => TranslationSource::Bundled,
        }
    }
}
