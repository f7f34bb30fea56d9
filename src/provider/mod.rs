//! Voice-call provider interface
//!
//! The dispatcher talks to the provider through the `CallProvider` trait so
//! the HTTP client can be swapped for a fake in tests. `VapiClient` is the
//! production implementation.

mod vapi;

pub use vapi::VapiClient;

use crate::Secret;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Provider-related errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Vapi API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ProviderError {
    /// Build a status error from a non-2xx response body.
    ///
    /// Vapi error bodies carry `message` as a string or a list of strings;
    /// `error` holds the reason phrase. Non-JSON bodies are passed through.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| error_message(&json))
            .unwrap_or_else(|| body.trim().to_string());

        let message = if message.is_empty() {
            format!("empty response body (HTTP {})", status)
        } else {
            message
        };

        ProviderError::Status { status, message }
    }
}

fn error_message(json: &serde_json::Value) -> Option<String> {
    match json.get("message") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            if !parts.is_empty() {
                return Some(parts.join("; "));
            }
        }
        _ => {}
    }

    json.get("error")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Body of `POST /call/phone`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallBody {
    pub assistant_id: String,
    pub phone_number_id: String,
    pub customer: Customer,
}

/// The person being called
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A provider call object
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub id: String,
    pub status: Option<String>,
    pub transcript: Option<String>,
    pub cost: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_reason: Option<String>,
    /// The payload as received
    pub raw: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCall {
    id: String,
    status: Option<String>,
    transcript: Option<String>,
    cost: Option<f64>,
    created_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    ended_reason: Option<String>,
    artifact: Option<WireArtifact>,
}

#[derive(Deserialize)]
struct WireArtifact {
    transcript: Option<String>,
}

impl ProviderCall {
    /// Decode a call object; only `id` is required
    pub fn from_value(raw: serde_json::Value) -> Result<Self, ProviderError> {
        let wire: WireCall = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::InvalidResponse(format!("unexpected call object: {}", e)))?;

        let transcript = wire
            .transcript
            .or_else(|| wire.artifact.and_then(|a| a.transcript))
            .filter(|t| !t.is_empty());

        Ok(Self {
            id: wire.id,
            status: wire.status,
            transcript,
            cost: wire.cost,
            created_at: wire.created_at,
            started_at: wire.started_at,
            ended_at: wire.ended_at,
            ended_reason: wire.ended_reason,
            raw,
        })
    }

    /// Call length, when the provider reported both start and end
    pub fn duration_seconds(&self) -> Option<f64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) if end >= start => {
                Some((end - start).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }
}

/// Trait for voice-call providers
#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Start an outbound phone call
    async fn create_call(
        &self,
        api_key: &Secret,
        body: &CreateCallBody,
    ) -> Result<ProviderCall, ProviderError>;

    /// Fetch the current state of a call
    async fn get_call(&self, api_key: &Secret, call_id: &str) -> Result<ProviderCall, ProviderError>;
}
