//! vapi-mcp - outbound phone calls for AI agents
//!
//! Exposes a single MCP tool, `make_vapi_call`, that asks the Vapi voice-AI
//! platform to place a phone call with one of the configured assistants and
//! relays a normalized result back to the calling agent.

pub mod call;
pub mod config;
pub mod dispatcher;
pub mod mcp;
pub mod provider;
pub mod web;

pub use call::{AssistantSelector, CallFailure, CallRequest, CallResult, CallSuccess, ErrorKind};
pub use dispatcher::CallDispatcher;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use uuid::Uuid;

/// Core error types for vapi-mcp
#[derive(Error, Debug)]
pub enum VapiMcpError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A secret string wrapper whose `Debug` output never shows the value
#[derive(Clone)]
pub struct Secret(SecretString);

impl Secret {
    /// Create a new secret from a string
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// Expose the secret value
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Context for a single tool invocation
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Unique request identifier, recorded on the invocation's tracing span
    pub request_id: String,
    /// When the invocation was received
    pub timestamp: DateTime<Utc>,
}

impl CallContext {
    /// Create a new context with a generated ID
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Milliseconds since the invocation was received
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.timestamp).num_milliseconds()
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
