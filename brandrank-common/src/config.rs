//! Bootstrap configuration loading and credential resolution
//!
//! Configuration file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. `BRANDRANK_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/brandrank/brandrank.toml` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! API credentials resolve ENV → TOML. Missing credentials are not a startup
//! error; requests fail with a configuration error instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "BRANDRANK_CONFIG";

/// Environment variable holding the upstream API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "brandrank.toml";

/// Bootstrap configuration loaded from TOML
///
/// Every field has a built-in default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Chat-completion API base URL (without the `/chat/completions` suffix)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upstream API key (ENV takes priority)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Models queried for every dimension (Phase 2 matrix rows)
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Model used for Phase 1 dimension discovery
    #[serde(default = "default_helper_model")]
    pub discovery_model: String,

    /// Model used as the entity resolution judge
    #[serde(default = "default_helper_model")]
    pub judge_model: String,

    /// Model used for the Phase 3 narrative summary
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Cap on outbound model calls per request
    #[serde(default = "default_call_budget")]
    pub call_budget: usize,

    /// Per-call timeout for outbound model requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            api_base_url: default_api_base_url(),
            api_key: None,
            models: default_models(),
            discovery_model: default_helper_model(),
            judge_model: default_helper_model(),
            summary_model: default_summary_model(),
            call_budget: default_call_budget(),
            request_timeout_secs: default_request_timeout_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5730
}

fn default_api_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_models() -> Vec<String> {
    [
        "openai/gpt-4o",
        "anthropic/claude-3.5-sonnet",
        "meta-llama/llama-3-70b-instruct",
        "google/gemini-pro-1.5",
        "mistralai/mistral-large",
        "perplexity/llama-3-sonar-large-32k-online",
    ]
    .iter()
    .map(|m| m.to_string())
    .collect()
}

fn default_helper_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_summary_model() -> String {
    "openai/gpt-4o".to_string()
}

fn default_call_budget() -> usize {
    45
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.models.iter().all(|m| m.trim().is_empty()) {
            return Err(Error::Config("At least one model must be configured".to_string()));
        }
        if self.call_budget == 0 {
            return Err(Error::Config("call_budget must be greater than zero".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve which config file to read, if any
///
/// Returns `None` when neither an explicit path nor a platform config file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`<config_dir>/brandrank/brandrank.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("brandrank").join(CONFIG_FILE_NAME))
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration following the resolution order, falling back to defaults
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => {
            info!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolve the upstream API key
///
/// **Priority:** ENV → TOML. Blank values count as absent.
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in both {} and TOML config. Using environment (highest priority).",
            API_KEY_ENV
        );
    }

    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Some(key.trim().to_string());
    }

    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Some(key.trim().to_string());
    }

    warn!(
        "No API key configured; ranking requests will fail until {} is set",
        API_KEY_ENV
    );
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
