//! SolarSense Configuration - model artifacts, attribution, insights, server
//!
//! Each struct implements `Default`, so an empty or partial TOML file always
//! yields a complete, valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "SOLARSENSE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "solarsense.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a SolarSense deployment.
///
/// Load with `SolarConfig::load()` which searches:
/// 1. `$SOLARSENSE_CONFIG` env var
/// 2. `./solarsense.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolarConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Model artifact locations
    #[serde(default)]
    pub models: ModelPaths,

    /// Attribution path selection
    #[serde(default)]
    pub attribution: AttributionConfig,

    /// Optional external insight service
    #[serde(default)]
    pub insights: InsightsConfig,
}

impl SolarConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SOLARSENSE_CONFIG` environment variable
    /// 2. `./solarsense.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from SOLARSENSE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from SOLARSENSE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "SOLARSENSE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./solarsense.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./solarsense.toml, using defaults");
                }
            }
        }

        info!("No solarsense.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings and never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate that values are usable.
    ///
    /// Checks:
    /// - Insight timeout and token budget must be > 0
    /// - Sampling temperature must be within [0, 2]
    /// - An endpoint is required when the external service is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let i = &self.insights;

        if i.timeout_secs == 0 {
            errors.push("insights.timeout_secs must be > 0".to_string());
        }
        if i.max_tokens == 0 {
            errors.push("insights.max_tokens must be > 0".to_string());
        }
        if !i.temperature.is_finite() || !(0.0..=2.0).contains(&i.temperature) {
            errors.push(format!(
                "insights.temperature = {} must be within [0, 2]",
                i.temperature
            ));
        }
        if i.external_enabled && i.endpoint.trim().is_empty() {
            errors.push(
                "insights.endpoint must be set when insights.external_enabled = true".to_string(),
            );
        }
        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `SOLARSENSE_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Model Paths
// ============================================================================

/// Locations of the trained model artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPaths {
    /// Efficiency regression tree ensemble (JSON)
    #[serde(default = "default_efficiency_path")]
    pub efficiency_path: PathBuf,

    /// Suitability classification tree ensemble (JSON)
    #[serde(default = "default_suitability_path")]
    pub suitability_path: PathBuf,

    /// Optional efficiency feature schema (JSON array of names).
    /// When unset, the artifact's embedded feature names are used.
    #[serde(default)]
    pub efficiency_schema_path: Option<PathBuf>,

    /// Optional suitability feature schema (JSON array of names).
    #[serde(default)]
    pub suitability_schema_path: Option<PathBuf>,
}

fn default_efficiency_path() -> PathBuf {
    PathBuf::from("models/efficiency_model.json")
}

fn default_suitability_path() -> PathBuf {
    PathBuf::from("models/suitability_model.json")
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self {
            efficiency_path: default_efficiency_path(),
            suitability_path: default_suitability_path(),
            efficiency_schema_path: None,
            suitability_schema_path: None,
        }
    }
}

// ============================================================================
// Attribution Config
// ============================================================================

/// Attribution path selection, decided once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Attempt the exact tree explainer. When false, or when the explainer
    /// cannot be built for the loaded model, the rule-based proxy is used.
    #[serde(default = "default_true")]
    pub exact: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self { exact: true }
    }
}

// ============================================================================
// Insights Config
// ============================================================================

/// External natural-language insight service (OpenAI-compatible chat API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Use the external service; rule-based insights remain the fallback.
    #[serde(default)]
    pub external_enabled: bool,

    /// Chat completions endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Hard timeout for one request (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    defaults::INSIGHT_HTTP_TIMEOUT_SECS
}

fn default_max_tokens() -> u32 {
    defaults::INSIGHT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    defaults::INSIGHT_TEMPERATURE
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            external_enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
