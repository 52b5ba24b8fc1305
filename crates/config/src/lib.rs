//! Configuration loading, validation, and management for NextStep.
//!
//! Loads configuration from `~/.nextstep/config.toml` with environment
//! variable overrides. Validates all settings at startup. Unknown keys are
//! rejected so a typo never silently falls back to a default.

pub mod prompts;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.nextstep/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Provider credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generation API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Transport-level timeout for one generation call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// How many recent turns are replayed to the model
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Open chat settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// Structured career recommender settings
    #[serde(default)]
    pub recommender: RecommenderConfig,

    /// Learning-resource search settings
    #[serde(default)]
    pub resources: ResourceSearchConfig,
}

fn default_model() -> String {
    "gemini-3-flash-preview".into()
}
fn default_api_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_context_window() -> usize {
    12
}
fn default_creative_temperature() -> f32 {
    0.9
}
fn default_search_temperature() -> f32 {
    0.35
}
fn default_top_p() -> f32 {
    0.95
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("context_window", &self.context_window)
            .field("chat", &self.chat)
            .field("recommender", &self.recommender)
            .field("resources", &self.resources)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    #[serde(default = "default_chat_instruction")]
    pub system_instruction: String,

    /// First assistant turn of every new conversation
    #[serde(default = "default_chat_greeting")]
    pub greeting: String,

    #[serde(default = "default_creative_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_chat_instruction() -> String {
    prompts::CHAT_SYSTEM_INSTRUCTION.into()
}
fn default_chat_greeting() -> String {
    prompts::CHAT_GREETING.into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_chat_instruction(),
            greeting: default_chat_greeting(),
            temperature: default_creative_temperature(),
            top_p: default_top_p(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommenderConfig {
    #[serde(default = "default_recommender_instruction")]
    pub system_instruction: String,

    #[serde(default = "default_creative_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_recommender_instruction() -> String {
    prompts::RECOMMENDER_SYSTEM_INSTRUCTION.into()
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            system_instruction: default_recommender_instruction(),
            temperature: default_creative_temperature(),
            top_p: default_top_p(),
        }
    }
}

/// The curator prompt is sent as the user turn, so the system instruction
/// is empty unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSearchConfig {
    #[serde(default)]
    pub system_instruction: String,

    #[serde(default = "default_search_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Attach web-search grounding to the request
    #[serde(default = "default_true")]
    pub web_search: bool,
}

impl Default for ResourceSearchConfig {
    fn default() -> Self {
        Self {
            system_instruction: String::new(),
            temperature: default_search_temperature(),
            top_p: default_top_p(),
            web_search: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.nextstep/config.toml).
    ///
    /// Also checks environment variables:
    /// - `GEMINI_API_KEY`, then `GOOGLE_API_KEY` (only when the file sets no key)
    /// - `NEXTSTEP_MODEL`
    /// - `NEXTSTEP_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(model) = std::env::var("NEXTSTEP_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("NEXTSTEP_API_URL") {
            config.api_url = url;
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

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), model = %config.model, "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".nextstep")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if self.context_window == 0 {
            return Err(ConfigError::ValidationError(
                "context_window must be at least 1".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be at least 1".into(),
            ));
        }

        check_sampling("chat", self.chat.temperature, self.chat.top_p)?;
        check_sampling(
            "recommender",
            self.recommender.temperature,
            self.recommender.top_p,
        )?;
        check_sampling("resources", self.resources.temperature, self.resources.top_p)?;

        if self.chat.greeting.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "chat.greeting must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if a non-blank API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn check_sampling(section: &str, temperature: f32, top_p: f32) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::ValidationError(format!(
            "{section}.temperature must be between 0.0 and 2.0"
        )));
    }
    if !(top_p > 0.0 && top_p <= 1.0) {
        return Err(ConfigError::ValidationError(format!(
            "{section}.top_p must be in (0.0, 1.0]"
        )));
    }
    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
            context_window: default_context_window(),
            chat: ChatConfig::default(),
            recommender: RecommenderConfig::default(),
            resources: ResourceSearchConfig::default(),
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
