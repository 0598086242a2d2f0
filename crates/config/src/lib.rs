//! Configuration loading, validation, and management for the actor CLI.
//!
//! Loads configuration from `~/.ai/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ai/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible inference server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; LM Studio ignores it, other servers may need it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Inference request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Sampling temperature; omitted from requests when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Model selection per run mode
    #[serde(default)]
    pub models: ModelsConfig,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentSection,

    /// Shell tool settings
    #[serde(default)]
    pub shell: ShellConfig,

    /// Web tool settings
    #[serde(default)]
    pub web: WebConfig,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".into()
}
fn default_request_timeout() -> u64 {
    300
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
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("temperature", &self.temperature)
            .field("models", &self.models)
            .field("agent", &self.agent)
            .field("shell", &self.shell)
            .field("web", &self.web)
            .finish()
    }
}

impl std::fmt::Debug for WebConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebConfig")
            .field("kagi_api_key", &redact(&self.kagi_api_key))
            .field("fetch_max_bytes", &self.fetch_max_bytes)
            .field("fetch_max_chars", &self.fetch_max_chars)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model for `act` runs; must support tool calling
    #[serde(default = "default_act_model")]
    pub act: String,

    /// Model for `ask` runs
    #[serde(default = "default_ask_model")]
    pub ask: String,

    /// Draft model for speculative decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<String>,
}

fn default_act_model() -> String {
    "qwen/qwen3-30b-a3b-2507".into()
}
fn default_ask_model() -> String {
    "openai/gpt-oss-20b".into()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            act: default_act_model(),
            ask: default_ask_model(),
            draft: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Maximum inference round-trips per run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_steps() -> u32 {
    25
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_shell_timeout")]
    pub timeout_secs: u64,

    /// Commands that run without prompting
    #[serde(default)]
    pub always_allow: Vec<String>,

    /// Commands that are always refused
    #[serde(default)]
    pub forbidden: Vec<String>,
}

fn default_shell_timeout() -> u64 {
    300
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_shell_timeout(),
            always_allow: vec![],
            forbidden: vec![],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kagi_api_key: Option<String>,

    /// Largest response body web_fetch will download
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: u64,

    /// Largest converted text web_fetch will return
    #[serde(default = "default_fetch_max_chars")]
    pub fetch_max_chars: usize,
}

fn default_fetch_max_bytes() -> u64 {
    10_000_000
}
fn default_fetch_max_chars() -> usize {
    100_000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            kagi_api_key: None,
            fetch_max_bytes: default_fetch_max_bytes(),
            fetch_max_chars: default_fetch_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ai/config.toml).
    ///
    /// Environment variables take priority over the file:
    /// - `AI_BASE_URL`
    /// - `AI_API_KEY`
    /// - `AI_MODEL` (both run modes)
    /// - `KAGI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
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

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("AI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(key) = get("AI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = get("AI_MODEL") {
            self.models.act = model.clone();
            self.models.ask = model;
        }
        if let Some(key) = get("KAGI_API_KEY") {
            self.web.kagi_api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ai")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("base_url must not be empty".into()));
        }

        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if let Some(cmd) = self
            .shell
            .always_allow
            .iter()
            .find(|c| self.shell.forbidden.contains(c))
        {
            return Err(ConfigError::ValidationError(format!(
                "shell command '{cmd}' is both always_allow and forbidden"
            )));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            temperature: None,
            models: ModelsConfig::default(),
            agent: AgentSection::default(),
            shell: ShellConfig::default(),
            web: WebConfig::default(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.models.act, "qwen/qwen3-30b-a3b-2507");
        assert_eq!(config.models.ask, "openai/gpt-oss-20b");
        assert_eq!(config.agent.max_steps, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.base_url, config.base_url);
        assert_eq!(parsed.shell.timeout_secs, config.shell.timeout_secs);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: Some(5.0),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn conflicting_shell_lists_rejected() {
        let mut config = AppConfig::default();
        config.shell.always_allow = vec!["ls".into()];
        config.shell.forbidden = vec!["ls".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.models.act, "qwen/qwen3-30b-a3b-2507");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
temperature = 0.2

[models]
draft = "qwen/qwen3-0.6b"

[shell]
always_allow = ["ls", "git"]
forbidden = ["sudo"]
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.models.draft.as_deref(), Some("qwen/qwen3-0.6b"));
        assert_eq!(config.models.act, "qwen/qwen3-30b-a3b-2507");
        assert_eq!(config.shell.always_allow, vec!["ls", "git"]);
        assert_eq!(config.shell.timeout_secs, 300);
        assert_eq!(config.web.fetch_max_chars, 100_000);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_take_priority() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("AI_BASE_URL", "http://gpu-box:1234/v1"),
            ("AI_MODEL", "qwen/qwen3-8b"),
            ("KAGI_API_KEY", "kg-secret"),
            ("AI_API_KEY", ""),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url, "http://gpu-box:1234/v1");
        assert_eq!(config.models.act, "qwen/qwen3-8b");
        assert_eq!(config.models.ask, "qwen/qwen3-8b");
        assert_eq!(config.web.kagi_api_key.as_deref(), Some("kg-secret"));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-live".into());
        config.web.kagi_api_key = Some("kg-live".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-live"));
        assert!(!debug.contains("kg-live"));
        assert!(debug.contains("[REDACTED]"));
    }
}
