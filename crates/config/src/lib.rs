//! Configuration loading, validation, and management for Parlance.
//!
//! Loads configuration from `~/.parlance/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.parlance/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completion endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key for the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name. Required by first-party endpoints, optional for gateways.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// How to authenticate against the endpoint
    #[serde(default)]
    pub endpoint_kind: EndpointKindSetting,

    /// System prompt template, rendered with `prompt_variables`
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Data made available to the system prompt template
    #[serde(default)]
    pub prompt_variables: HashMap<String, serde_json::Value>,

    /// Upper bound for a single model request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum model re-invocations triggered by function results in one turn
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Where the CLI persists conversation history
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
}

/// Endpoint authentication style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKindSetting {
    /// Decide from the endpoint URL
    #[default]
    Auto,
    /// Bearer token, model required
    FirstParty,
    /// `api-key` header, model optional
    Gateway,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".into()
}
fn default_system_prompt() -> String {
    "You are an ordering assistant for {{restaurant}}. Help the user order food.".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_max_depth() -> u32 {
    8
}
fn default_history_file() -> PathBuf {
    PathBuf::from("history.json")
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("endpoint_kind", &self.endpoint_kind)
            .field("system_prompt", &self.system_prompt)
            .field("prompt_variables", &self.prompt_variables)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_depth", &self.max_depth)
            .field("history_file", &self.history_file)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parlance/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PARLANCE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `PARLANCE_ENDPOINT`
    /// - `PARLANCE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, then apply overrides looked up through `env`.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;

        if config.api_key.is_none() {
            config.api_key = env("PARLANCE_API_KEY").or_else(|| env("OPENAI_API_KEY"));
        }

        if let Some(endpoint) = env("PARLANCE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Some(model) = env("PARLANCE_MODEL") {
            config.model = Some(model);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parlance")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError("endpoint must not be empty".into()));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if self.max_depth == 0 {
            return Err(ConfigError::ValidationError("max_depth must be >= 1".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: Some("gpt-4o-mini".into()),
            endpoint_kind: EndpointKindSetting::Auto,
            system_prompt: default_system_prompt(),
            prompt_variables: HashMap::from([(
                "restaurant".to_string(),
                serde_json::Value::String("the Harbour Kitchen".into()),
            )]),
            request_timeout_secs: default_request_timeout_secs(),
            max_depth: default_max_depth(),
            history_file: default_history_file(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
