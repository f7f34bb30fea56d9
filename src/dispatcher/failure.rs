//! Failure classification
//!
//! Turns configuration and provider errors into stable `CallFailure`
//! values. Every failure carries a remediation suggestion.

use crate::config::ConfigError;
use crate::provider::ProviderError;
use crate::{CallFailure, CallRequest, ErrorKind};

/// A configuration problem detected before any network call
pub fn config_failure(err: ConfigError) -> CallFailure {
    let suggestion = match &err {
        ConfigError::MissingVariables(missing) => format!(
            "Set {} in the server environment (or the [provider] section of the config file) and restart the server.",
            missing.join(", ")
        ),
        _ => "Fix the server configuration and restart the server.".to_string(),
    };

    CallFailure {
        error_type: ErrorKind::ConfigError,
        error_code: "missing_config".to_string(),
        error: err.to_string(),
        message: "Please configure all required environment variables".to_string(),
        suggestion,
        status_code: None,
    }
}

/// Classify a provider error for the given request
pub fn provider_failure(request: &CallRequest, err: ProviderError) -> CallFailure {
    let failed = format!(
        "Failed to initiate call to {}",
        request.destination_phone_number
    );
    let error = err.to_string();

    match err {
        ProviderError::Status { status, message } => {
            let (error_type, error_code, suggestion) = classify_status(request, status, &message);
            CallFailure {
                error_type,
                error_code: error_code.to_string(),
                error,
                message: failed,
                suggestion,
                status_code: Some(status),
            }
        }
        ProviderError::Timeout(after) => CallFailure {
            error_type: ErrorKind::TimeoutError,
            error_code: "timeout".to_string(),
            error: "Request timeout - Vapi API did not respond in time".to_string(),
            message: "Call initiation timed out".to_string(),
            suggestion: format!(
                "Vapi did not answer within {}s. Check the Vapi dashboard before retrying, since the call may already have been placed.",
                after.as_secs()
            ),
            status_code: None,
        },
        ProviderError::Network(_) => CallFailure {
            error_type: ErrorKind::UnknownError,
            error_code: "network_error".to_string(),
            error,
            message: "Failed to connect to Vapi API".to_string(),
            suggestion: "Check network connectivity from the server and the configured VAPI_BASE_URL.".to_string(),
            status_code: None,
        },
        ProviderError::InvalidResponse(_) => CallFailure {
            error_type: ErrorKind::UnknownError,
            error_code: "invalid_response".to_string(),
            error,
            message: failed,
            suggestion: "Vapi returned an unexpected response. Check the Vapi dashboard to see whether the call was placed.".to_string(),
            status_code: None,
        },
        ProviderError::Client(_) => CallFailure {
            error_type: ErrorKind::UnknownError,
            error_code: "client_error".to_string(),
            error,
            message: "An unexpected error occurred while making the call".to_string(),
            suggestion: "Check the server logs and the provider configuration.".to_string(),
            status_code: None,
        },
    }
}

fn classify_status(
    request: &CallRequest,
    status: u16,
    message: &str,
) -> (ErrorKind, &'static str, String) {
    match status {
        400 if is_phone_problem(request, message) => (
            ErrorKind::ApiError,
            "invalid_phone",
            "Use international E.164 format with a leading '+' and country code, e.g. +15551234567.".to_string(),
        ),
        400 => (
            ErrorKind::ApiError,
            "invalid_request",
            format!(
                "Vapi rejected the request: {}. Check the arguments and the configured assistant and phone-number ids.",
                message
            ),
        ),
        401 => (
            ErrorKind::AuthError,
            "unauthorized",
            "Check that VAPI_API_KEY is a valid Vapi private API key.".to_string(),
        ),
        403 => (
            ErrorKind::AuthError,
            "forbidden",
            "The API key is not allowed to use this assistant or phone number. Check the key's permissions in the Vapi dashboard.".to_string(),
        ),
        404 => (
            ErrorKind::ApiError,
            "not_found",
            format!(
                "Check that the {} assistant id and PHONE id exist in the Vapi account.",
                request.assistant.env_var()
            ),
        ),
        429 => (
            ErrorKind::ApiError,
            "rate_limited",
            "Vapi is rate limiting requests. Wait a moment before trying again.".to_string(),
        ),
        500..=599 => (
            ErrorKind::ApiError,
            "provider_unavailable",
            "Vapi had a server-side problem. Try again later.".to_string(),
        ),
        _ => (
            ErrorKind::ApiError,
            "http_error",
            "Unexpected response from Vapi. Check the Vapi status page and try again.".to_string(),
        ),
    }
}

/// Whether a 400 is about the destination number
fn is_phone_problem(request: &CallRequest, message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    !request.destination_phone_number.starts_with('+')
        || message.contains("customer.number")
        || message.contains("phone number")
        || message.contains("e.164")
}
