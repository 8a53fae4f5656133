//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// RTC provider credentials and vendor endpoints.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// LLM vendor settings for triage analysis.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// RTC provider credentials. The certificate and REST secret never leave
/// this process; clients only ever see minted tokens.
#[derive(Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// Provider application id, safe to expose to clients.
    #[serde(default)]
    pub app_id: String,

    /// Signing certificate for join tokens.
    #[serde(default)]
    pub app_certificate: String,

    /// REST API key for the hosted conversational-agent service.
    #[serde(default)]
    pub rest_key: String,

    /// REST API secret paired with `rest_key`.
    #[serde(default)]
    pub rest_secret: String,

    /// Base URL of the hosted conversational-agent API.
    #[serde(default = "default_convo_base_url")]
    pub convo_base_url: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("app_id", &self.app_id)
            .field("app_certificate", &"[REDACTED]")
            .field("rest_key", &self.rest_key)
            .field("rest_secret", &"[REDACTED]")
            .field("convo_base_url", &self.convo_base_url)
            .finish()
    }
}

/// LLM vendor configuration for the analysis endpoint.
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    /// Bearer key for the chat-completions API.
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier to request.
    #[serde(default = "default_llm_model")]
    pub model: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "vetline_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_convo_base_url() -> String {
    "https://api.agora.io/api/conversational-ai-agent/v2".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VETLINE_HOST` / `VETLINE_PORT` override `server.*`
/// - `VETLINE_APP_ID` / `VETLINE_APP_CERTIFICATE` override provider identity
/// - `VETLINE_REST_KEY` / `VETLINE_REST_SECRET` override vendor REST auth
/// - `VETLINE_CONVO_BASE_URL` overrides `provider.convo_base_url`
/// - `VETLINE_LLM_API_KEY` / `VETLINE_LLM_BASE_URL` / `VETLINE_LLM_MODEL`
///   override `llm.*`
/// - `VETLINE_LOG_LEVEL` / `VETLINE_LOG_JSON` override `logging.*`
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("VETLINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("VETLINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(v) = std::env::var("VETLINE_APP_ID") {
        config.provider.app_id = v;
    }
    if let Ok(v) = std::env::var("VETLINE_APP_CERTIFICATE") {
        config.provider.app_certificate = v;
    }
    if let Ok(v) = std::env::var("VETLINE_REST_KEY") {
        config.provider.rest_key = v;
    }
    if let Ok(v) = std::env::var("VETLINE_REST_SECRET") {
        config.provider.rest_secret = v;
    }
    if let Ok(v) = std::env::var("VETLINE_CONVO_BASE_URL") {
        config.provider.convo_base_url = v;
    }
    if let Ok(v) = std::env::var("VETLINE_LLM_API_KEY") {
        config.llm.api_key = v;
    }
    if let Ok(v) = std::env::var("VETLINE_LLM_BASE_URL") {
        config.llm.base_url = v;
    }
    if let Ok(v) = std::env::var("VETLINE_LLM_MODEL") {
        config.llm.model = v;
    }
    if let Ok(level) = std::env::var("VETLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("VETLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
