//! Call request and result types
//!
//! `CallRequest` is what an agent asks for; `CallResult` is what it gets
//! back. Results serialize as a flat JSON object with a boolean `success`
//! discriminator so MCP clients can branch without knowing Rust enums.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Which configured Vapi assistant should place the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantSelector {
    #[default]
    Andy,
    Mam,
}

impl AssistantSelector {
    pub const ALL: [AssistantSelector; 2] = [AssistantSelector::Andy, AssistantSelector::Mam];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantSelector::Andy => "andy",
            AssistantSelector::Mam => "mam",
        }
    }

    /// Environment variable holding this assistant's Vapi id
    pub fn env_var(&self) -> &'static str {
        match self {
            AssistantSelector::Andy => "ANDY",
            AssistantSelector::Mam => "MAM",
        }
    }

    /// Parse a selector, falling back to the default for anything unknown
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            None => Self::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    assistant = %raw,
                    fallback = %Self::default(),
                    "Unknown assistant selector, using default"
                );
                Self::default()
            }),
        }
    }
}

impl fmt::Display for AssistantSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssistantSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "andy" => Ok(AssistantSelector::Andy),
            "mam" => Ok(AssistantSelector::Mam),
            other => Err(format!("Unknown assistant: {}", other)),
        }
    }
}

/// A request to place one outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Number to dial, expected in international format (e.g. "+15551234567")
    pub destination_phone_number: String,
    /// Customer name passed to the assistant for context
    pub customer_name: Option<String>,
    /// Assistant that places the call
    pub assistant: AssistantSelector,
}

impl CallRequest {
    pub fn new(destination_phone_number: impl Into<String>) -> Self {
        Self {
            destination_phone_number: destination_phone_number.into(),
            customer_name: None,
            assistant: AssistantSelector::default(),
        }
    }

    /// Set the customer name; blank names are treated as absent
    pub fn with_customer_name(mut self, name: Option<String>) -> Self {
        self.customer_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_assistant(mut self, assistant: AssistantSelector) -> Self {
        self.assistant = assistant;
        self
    }
}

/// Failure categories reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid server configuration
    ConfigError,
    /// Provider rejected the credentials
    AuthError,
    /// Provider-side validation or processing failure
    ApiError,
    /// No response within the client timeout
    TimeoutError,
    /// Anything else: transport failures, undecodable responses
    UnknownError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigError => write!(f, "config_error"),
            ErrorKind::AuthError => write!(f, "auth_error"),
            ErrorKind::ApiError => write!(f, "api_error"),
            ErrorKind::TimeoutError => write!(f, "timeout_error"),
            ErrorKind::UnknownError => write!(f, "unknown_error"),
        }
    }
}

/// A call the provider accepted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallSuccess {
    pub call_id: String,
    pub status: Option<String>,
    pub message: String,
    pub assistant_used: AssistantSelector,
    pub assistant_id: String,
    pub phone_id: String,
    pub customer_number: String,
    pub customer_name: Option<String>,
    pub transcript: Option<String>,
    pub duration_seconds: Option<f64>,
    pub cost: Option<f64>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_reason: Option<String>,
    /// Whether the follow-up details fetch succeeded
    pub details_fetched: bool,
    /// Call object exactly as the provider last returned it
    pub raw_response: serde_json::Value,
}

/// A call that could not be placed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFailure {
    pub error_type: ErrorKind,
    /// Stable machine-readable code, e.g. "invalid_phone"
    pub error_code: String,
    /// Detailed description, including the provider's message when present
    pub error: String,
    /// One-line human summary
    pub message: String,
    /// What the caller can do about it
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Outcome of one `make_vapi_call` invocation
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Success(Box<CallSuccess>),
    Failure(CallFailure),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    pub fn as_success(&self) -> Option<&CallSuccess> {
        match self {
            CallResult::Success(success) => Some(success),
            CallResult::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&CallFailure> {
        match self {
            CallResult::Success(_) => None,
            CallResult::Failure(failure) => Some(failure),
        }
    }
}

impl From<CallSuccess> for CallResult {
    fn from(success: CallSuccess) -> Self {
        CallResult::Success(Box::new(success))
    }
}

impl From<CallFailure> for CallResult {
    fn from(failure: CallFailure) -> Self {
        CallResult::Failure(failure)
    }
}

impl Serialize for CallResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Tagged<'a, T> {
            success: bool,
            #[serde(flatten)]
            inner: &'a T,
        }

        match self {
            CallResult::Success(success) => Tagged {
                success: true,
                inner: success.as_ref(),
            }
            .serialize(serializer),
            CallResult::Failure(failure) => Tagged {
                success: false,
                inner: failure,
            }
            .serialize(serializer),
        }
    }
}
