//! Configuration system for vapi-mcp
//!
//! Loads configuration from an optional TOML file, then overlays process
//! environment variables (`VAPI_API_KEY`, `ANDY`, `MAM`, `PHONE`, ...).
//! The result is immutable and shared read-only by every tool invocation.

mod types;

pub use types::*;

use crate::{AssistantSelector, Secret};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use url::Url;

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ENRICH_DELAY_SECS: u64 = 3;

pub const ENV_API_KEY: &str = "VAPI_API_KEY";
pub const ENV_PHONE: &str = "PHONE";
pub const ENV_BASE_URL: &str = "VAPI_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "VAPI_TIMEOUT_SECS";
pub const ENV_ENRICH: &str = "VAPI_ENRICH";
pub const ENV_ENRICH_DELAY_SECS: &str = "VAPI_ENRICH_DELAY_SECS";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
}

/// Main vapi-mcp configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Vapi provider configuration
    pub provider: ProviderConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Load configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Self::from_raw(raw)
    }

    /// Load the file (explicit path, or the default path when it exists),
    /// then overlay the process environment
    pub async fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load(path).await?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::load(&default_path).await?
                } else {
                    Self::default()
                }
            }
        };

        config.with_env(|key| std::env::var(key).ok())
    }

    /// Overlay environment variables read through `lookup`.
    ///
    /// Environment values win over file values. Empty values count as unset.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.provider.api_key = Some(Secret::new(key));
        }
        for selector in AssistantSelector::ALL {
            if let Some(id) = get(selector.env_var()) {
                self.provider.assistants.insert(selector, id);
            }
        }
        if let Some(phone) = get(ENV_PHONE) {
            self.provider.phone_number_id = Some(phone);
        }
        if let Some(base_url) = get(ENV_BASE_URL) {
            self.provider.base_url = parse_base_url(&base_url)?;
        }
        if let Some(secs) = get(ENV_TIMEOUT_SECS) {
            self.provider.timeout = request_timeout(ENV_TIMEOUT_SECS, parse_number(ENV_TIMEOUT_SECS, &secs)?)?;
        }
        if let Some(flag) = get(ENV_ENRICH) {
            self.provider.enrichment.enabled = parse_flag(ENV_ENRICH, &flag)?;
        }
        if let Some(secs) = get(ENV_ENRICH_DELAY_SECS) {
            self.provider.enrichment.delay =
                Duration::from_secs(parse_number(ENV_ENRICH_DELAY_SECS, &secs)?);
        }

        let host = get(ENV_HOST);
        let port = get(ENV_PORT);
        if host.is_some() || port.is_some() {
            let port = match port {
                Some(p) => p
                    .parse::<u16>()
                    .map_err(|_| ConfigError::Invalid(format!("{} must be a port number, got '{}'", ENV_PORT, p)))?,
                None => self.server.port(),
            };
            let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
            self.server.bind = bind_address(&host, port);
        }

        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.logging.format = LogFormat::parse(&format);
        }

        Ok(self)
    }

    /// Convert from raw TOML config to validated config
    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let server = raw.server.unwrap_or_default().into();
        let logging = raw.logging.unwrap_or_default().into();
        let mut provider: ProviderConfig = raw.provider.unwrap_or_default().try_into()?;

        if let Some(enrichment) = raw.enrichment {
            provider.enrichment = enrichment.into();
        }

        Ok(Self {
            server,
            logging,
            provider,
        })
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            provider: ProviderConfig::default(),
        }
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vapi-mcp")
            .join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: String,
}

impl ServerConfig {
    /// Port component of the bind address
    pub fn port(&self) -> u16 {
        self.bind
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or(8000)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Format: "json" or "pretty"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format
    Pretty,
    /// JSON format
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Vapi provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Vapi private API key
    pub api_key: Option<Secret>,
    /// Assistant id per selector
    pub assistants: HashMap<AssistantSelector, String>,
    /// Vapi phone-number id that calls are placed from
    pub phone_number_id: Option<String>,
    /// API base URL
    pub base_url: Url,
    /// Client-side timeout for each provider request
    pub timeout: Duration,
    /// Follow-up details fetch
    pub enrichment: EnrichmentConfig,
}

/// Everything needed to place a call with one assistant
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCallConfig<'a> {
    pub api_key: &'a Secret,
    pub assistant_id: &'a str,
    pub phone_number_id: &'a str,
}

impl ProviderConfig {
    /// Look up what `selector` needs, naming every missing variable
    pub fn resolve(&self, selector: AssistantSelector) -> Result<ResolvedCallConfig<'_>, ConfigError> {
        let assistant_id = self.assistants.get(&selector);
        let mut missing = Vec::new();

        if self.api_key.is_none() {
            missing.push(ENV_API_KEY.to_string());
        }
        if assistant_id.is_none() {
            missing.push(selector.env_var().to_string());
        }
        if self.phone_number_id.is_none() {
            missing.push(ENV_PHONE.to_string());
        }

        match (&self.api_key, assistant_id, &self.phone_number_id) {
            (Some(api_key), Some(assistant_id), Some(phone_number_id)) => Ok(ResolvedCallConfig {
                api_key,
                assistant_id,
                phone_number_id,
            }),
            _ => Err(ConfigError::MissingVariables(missing)),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistants: HashMap::new(),
            phone_number_id: None,
            base_url: default_base_url(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            enrichment: EnrichmentConfig::default(),
        }
    }
}

/// Follow-up details fetch configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentConfig {
    /// Whether to fetch call details after initiation
    pub enabled: bool,
    /// How long to wait before fetching
    pub delay: Duration,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay: Duration::from_secs(DEFAULT_ENRICH_DELAY_SECS),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid")
}

/// Join host and port, bracketing bare IPv6 hosts
fn bind_address(host: &str, port: u16) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => SocketAddr::from((ip, port)).to_string(),
        _ => format!("{}:{}", host, port),
    }
}

/// Parse and check a provider base URL
pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("Invalid base URL '{}': {}", value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::Invalid(format!(
            "Base URL scheme '{}' not allowed. Only http and https are permitted.",
            scheme
        ))),
    }
}

/// Provider request timeout; zero would fail every request immediately
pub(crate) fn request_timeout(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid(format!("{} must be greater than zero", key)));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a whole number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
