//! Configuration loading, validation, and management for PersonaChat.
//!
//! Loads configuration from `~/.personachat/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.personachat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Who the chatbot speaks as, and where their profile lives
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Model that writes (and rewrites) answers
    #[serde(
        default = "ModelConfig::default_primary",
        deserialize_with = "ModelConfig::deserialize_primary"
    )]
    pub primary: ModelConfig,

    /// Independent model that judges answers
    #[serde(
        default = "ModelConfig::default_judge",
        deserialize_with = "ModelConfig::deserialize_judge"
    )]
    pub judge: ModelConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations (base URL overrides)
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Fixed replies that bypass the models entirely
    #[serde(default = "default_overrides")]
    pub overrides: Vec<OverrideConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona_name")]
    pub name: String,

    /// Path to the short biography text
    #[serde(default = "default_summary_path")]
    pub summary_path: String,

    /// Path to the structured profile text (pre-extracted)
    #[serde(default = "default_document_path")]
    pub document_path: String,
}

fn default_persona_name() -> String {
    "Your Name".into()
}
fn default_summary_path() -> String {
    "me/summary.txt".into()
}
fn default_document_path() -> String {
    "me/profile.txt".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            summary_path: default_summary_path(),
            document_path: default_document_path(),
        }
    }
}

/// One model deployment: which provider, which model, fixed decoding settings.
///
/// A `[primary]` or `[judge]` table only needs the keys it changes; the rest
/// come from that section's defaults.
#[derive(Clone, Serialize)]
pub struct ModelConfig {
    /// Provider name ("openrouter", "openai", "gemini", "ollama", ...)
    pub provider: String,

    /// Model identifier as the provider knows it
    pub model: String,

    /// API key (usually supplied through the environment instead)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL override for this deployment only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request a JSON-schema constrained reply (judge only)
    pub structured_output: bool,

    /// HTTP timeout for one call
    pub request_timeout_secs: u64,
}

/// The keys of a model table as written in the file.
#[derive(Deserialize)]
struct ModelTable {
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    api_url: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    structured_output: Option<bool>,
    request_timeout_secs: Option<u64>,
}

impl ModelTable {
    fn merge_into(self, base: ModelConfig) -> ModelConfig {
        ModelConfig {
            provider: self.provider.unwrap_or(base.provider),
            model: self.model.unwrap_or(base.model),
            api_key: self.api_key.or(base.api_key),
            api_url: self.api_url.or(base.api_url),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            structured_output: self.structured_output.unwrap_or(base.structured_output),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(base.request_timeout_secs),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_request_timeout() -> u64 {
    120
}

impl ModelConfig {
    pub fn default_primary() -> Self {
        Self {
            provider: "openrouter".into(),
            model: "tngtech/deepseek-r1t2-chimera:free".into(),
            api_key: None,
            api_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            structured_output: false,
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn default_judge() -> Self {
        Self {
            provider: "gemini".into(),
            model: "gemini-2.5-flash".into(),
            api_key: None,
            api_url: None,
            temperature: 0.0,
            max_tokens: 500,
            structured_output: true,
            request_timeout_secs: default_request_timeout(),
        }
    }

    fn deserialize_primary<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ModelTable::deserialize(deserializer).map(|table| table.merge_into(Self::default_primary()))
    }

    fn deserialize_judge<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ModelTable::deserialize(deserializer).map(|table| table.merge_into(Self::default_judge()))
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{section}.provider must not be empty"
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{section}.model must not be empty"
            )));
        }
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(format!(
                "{section}.temperature must be between 0.0 and 2.0"
            )));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{section}.max_tokens must be > 0"
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("structured_output", &self.structured_output)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Origins allowed by CORS (empty = same-origin only)
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    7860
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// A fixed reply for questions mentioning any of the keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideConfig {
    /// Rule name (shows up in logs and responses)
    pub name: String,

    /// Case-insensitive substrings; any match triggers the rule
    pub keywords: Vec<String>,

    /// Reply text. When omitted, a pig-latin deflection is rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.personachat/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - primary: `PERSONACHAT_PRIMARY_API_KEY`, `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - judge: `PERSONACHAT_JUDGE_API_KEY`, `GOOGLE_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from an explicit path and apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
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

    /// Fill in settings from the environment. Keys already present in the
    /// file win, except the persona name which the environment overrides.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.primary.api_key.is_none() {
            self.primary.api_key = env("PERSONACHAT_PRIMARY_API_KEY")
                .or_else(|| env("OPENROUTER_API_KEY"))
                .or_else(|| env("OPENAI_API_KEY"));
        }

        if self.judge.api_key.is_none() {
            self.judge.api_key = env("PERSONACHAT_JUDGE_API_KEY").or_else(|| env("GOOGLE_API_KEY"));
        }

        if let Some(name) = env("PERSONACHAT_PERSONA_NAME") {
            self.persona.name = name;
        }

        if let Some(model) = env("PERSONACHAT_PRIMARY_MODEL") {
            self.primary.model = model;
        }

        if let Some(model) = env("PERSONACHAT_JUDGE_MODEL") {
            self.judge.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".personachat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persona.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.name must not be empty".into(),
            ));
        }

        self.primary.validate("primary")?;
        self.judge.validate("judge")?;

        for rule in &self.overrides {
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "override '{}' needs at least one keyword",
                    rule.name
                )));
            }
        }

        Ok(())
    }

    /// Resolve the API key for a model deployment: its own key first, then
    /// the provider section's key.
    pub fn api_key_for(&self, model: &ModelConfig) -> Option<String> {
        model.api_key.clone().or_else(|| {
            self.providers
                .get(&model.provider)
                .and_then(|p| p.api_key.clone())
        })
    }

    /// Resolve the base URL override for a model deployment, if any.
    pub fn api_url_for(&self, model: &ModelConfig) -> Option<String> {
        model.api_url.clone().or_else(|| {
            self.providers
                .get(&model.provider)
                .and_then(|p| p.api_url.clone())
        })
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            persona: PersonaConfig::default(),
            primary: ModelConfig::default_primary(),
            judge: ModelConfig::default_judge(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
            overrides: default_overrides(),
        }
    }
}

/// The deployment ships one override: questions about patents get a
/// pig-latin deflection.
fn default_overrides() -> Vec<OverrideConfig> {
    vec![OverrideConfig {
        name: "patents".into(),
        keywords: vec!["patent".into()],
        response: None,
    }]
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
