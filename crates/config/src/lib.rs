//! Configuration loading, validation, and management for Sentinel.
//!
//! Loads configuration from `~/.sentinel/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The instruction the orchestrator runs under unless overridden.
pub const DEFAULT_AGENT_INSTRUCTION: &str = "\
You are an Autonomous Site Reliability Engineer (SRE).
1. When asked to check a service, FIRST use 'list_active_containers' or 'get_container_logs'.
2. If you see errors, pass them to 'consult_sre_expert'.
3. Only call 'restart_service' when the expert recommends restart_service.
4. Always report the final status.";

/// The root configuration structure.
///
/// Maps directly to `~/.sentinel/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature for the orchestrator
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// HTTP timeout for model calls, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Orchestrator configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Decision policy and calibration configuration
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Container runtime configuration
    #[serde(default)]
    pub ops: OpsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
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
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("gateway", &self.gateway)
            .field("agent", &self.agent)
            .field("policy", &self.policy)
            .field("ops", &self.ops)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Defaults applied when an /analyze request omits them
    #[serde(default = "default_api_user")]
    pub default_user_id: String,

    #[serde(default = "default_api_session")]
    pub default_session_id: String,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_api_user() -> String {
    "api_user_01".into()
}
fn default_api_session() -> String {
    "session_001".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit_bytes: default_body_limit(),
            default_user_id: default_api_user(),
            default_session_id: default_api_session(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// System instruction for the orchestrator
    #[serde(default = "default_instruction")]
    pub instruction: String,

    /// Maximum tool call iterations per turn (safety limit)
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,

    /// Session used by the interactive REPL
    #[serde(default = "default_repl_user")]
    pub repl_user_id: String,

    #[serde(default = "default_repl_session")]
    pub repl_session_id: String,
}

fn default_agent_name() -> String {
    "Sentinel_Prime".into()
}
fn default_instruction() -> String {
    DEFAULT_AGENT_INSTRUCTION.into()
}
fn default_max_iterations() -> u32 {
    25
}
fn default_repl_user() -> String {
    "admin_user".into()
}
fn default_repl_session() -> String {
    "live-session-01".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instruction: default_instruction(),
            max_tool_iterations: default_max_iterations(),
            repl_user_id: default_repl_user(),
            repl_session_id: default_repl_session(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Where the calibrated example set is stored.
    /// Defaults to `~/.sentinel/brain_compiled.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples_path: Option<String>,

    /// Model override for the policy (defaults to `default_model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_policy_temperature")]
    pub temperature: f32,

    #[serde(default = "default_policy_max_tokens")]
    pub max_tokens: u32,

    /// Request JSON-constrained output from the backend
    #[serde(default)]
    pub json_mode: bool,

    /// Calibration keeps at most this many passing demonstrations
    #[serde(default = "default_max_demos")]
    pub max_bootstrapped_demos: usize,
}

fn default_policy_temperature() -> f32 {
    0.0
}
fn default_policy_max_tokens() -> u32 {
    1024
}
fn default_max_demos() -> usize {
    2
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            examples_path: None,
            model: None,
            temperature: default_policy_temperature(),
            max_tokens: default_policy_max_tokens(),
            json_mode: false,
            max_bootstrapped_demos: default_max_demos(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsConfig {
    /// "docker" or "static"
    #[serde(default = "default_runtime_kind")]
    pub runtime: String,

    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Log lines fetched when the caller does not say
    #[serde(default = "default_tail")]
    pub default_tail: usize,

    /// When false the restart tool is not offered to the orchestrator
    #[serde(default = "default_true")]
    pub allow_restart: bool,
}

fn default_runtime_kind() -> String {
    "docker".into()
}
fn default_docker_binary() -> String {
    "docker".into()
}
fn default_tail() -> usize {
    50
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime_kind(),
            docker_binary: default_docker_binary(),
            default_tail: default_tail(),
            allow_restart: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.sentinel/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `SENTINEL_API_KEY` (highest priority)
    /// - `GEMINI_API_KEY` / `GOOGLE_API_KEY`
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
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

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = ["SENTINEL_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY", "OPENROUTER_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
        }

        if let Ok(provider) = std::env::var("SENTINEL_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("SENTINEL_MODEL") {
            self.default_model = model;
        }

        if let Ok(path) = std::env::var("SENTINEL_EXAMPLES_PATH") {
            self.policy.examples_path = Some(path);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sentinel")
    }

    /// Resolved location of the persisted example set.
    pub fn examples_path(&self) -> PathBuf {
        self.policy
            .examples_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("brain_compiled.json"))
    }

    /// The model the decision policy runs on.
    pub fn policy_model(&self) -> &str {
        self.policy.model.as_deref().unwrap_or(&self.default_model)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, temp) in [
            ("default_temperature", self.default_temperature),
            ("policy.temperature", self.policy.temperature),
        ] {
            if !(0.0..=2.0).contains(&temp) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 2.0"
                )));
            }
        }

        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be > 0".into(),
            ));
        }

        if self.policy.max_bootstrapped_demos == 0 {
            return Err(ConfigError::ValidationError(
                "policy.max_bootstrapped_demos must be > 0".into(),
            ));
        }

        if self.ops.default_tail == 0 {
            return Err(ConfigError::ValidationError(
                "ops.default_tail must be > 0".into(),
            ));
        }

        if !matches!(self.ops.runtime.as_str(), "docker" | "static") {
            return Err(ConfigError::ValidationError(format!(
                "ops.runtime must be \"docker\" or \"static\", got \"{}\"",
                self.ops.runtime
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
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
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            gateway: GatewayConfig::default(),
            agent: AgentConfig::default(),
            policy: PolicyConfig::default(),
            ops: OpsConfig::default(),
            providers: HashMap::new(),
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

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.policy.max_bootstrapped_demos, 2);
        assert_eq!(config.ops.default_tail, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.agent.instruction, config.agent.instruction);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.policy.temperature = 5.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("policy.temperature"));
    }

    #[test]
    fn unknown_runtime_rejected() {
        let mut config = AppConfig::default();
        config.ops.runtime = "podman-remote".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_model, "gemini-2.5-flash");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_provider = "openrouter"

[policy]
examples_path = "/var/lib/sentinel/brain.json"
max_bootstrapped_demos = 3

[ops]
runtime = "static"
allow_restart = false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, "openrouter");
        assert_eq!(config.policy.max_bootstrapped_demos, 3);
        assert_eq!(config.examples_path(), PathBuf::from("/var/lib/sentinel/brain.json"));
        assert!(!config.ops.allow_restart);
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_provider = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn policy_model_falls_back_to_default() {
        let mut config = AppConfig::default();
        assert_eq!(config.policy_model(), "gemini-2.5-flash");
        config.policy.model = Some("gemini-2.5-pro".into());
        assert_eq!(config.policy_model(), "gemini-2.5-pro");
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("max_bootstrapped_demos"));
    }
}
