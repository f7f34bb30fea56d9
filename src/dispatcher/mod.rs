//! Call dispatcher
//!
//! Implements `make_vapi_call`: resolve configuration, initiate the call,
//! optionally fetch call details, and merge everything into a `CallResult`.
//! Every error is converted into a `CallFailure` here; nothing escapes as a
//! protocol-level fault.

mod failure;

pub use failure::{config_failure, provider_failure};

use crate::config::{ProviderConfig, ResolvedCallConfig};
use crate::provider::{CallProvider, CreateCallBody, Customer, ProviderCall, ProviderError, VapiClient};
use crate::{CallContext, CallRequest, CallResult, CallSuccess, Secret};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Outcome of the best-effort details fetch
#[derive(Debug)]
pub enum Enrichment {
    /// Fetching is disabled
    Skipped,
    /// Details fetched
    Fetched(ProviderCall),
    /// Fetch failed; the call itself still succeeded
    Failed(ProviderError),
}

/// Places calls through a provider using immutable configuration
#[derive(Clone)]
pub struct CallDispatcher {
    config: Arc<ProviderConfig>,
    provider: Arc<dyn CallProvider>,
}

impl CallDispatcher {
    /// Create a dispatcher with an explicit provider
    pub fn new(config: Arc<ProviderConfig>, provider: Arc<dyn CallProvider>) -> Self {
        Self { config, provider }
    }

    /// Create a dispatcher backed by the Vapi HTTP API
    pub fn with_vapi(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = VapiClient::new(&config)?;
        Ok(Self::new(Arc::new(config), Arc::new(client)))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Place one call. Never fails; errors come back as `CallResult::Failure`.
    pub async fn make_call(&self, request: CallRequest) -> CallResult {
        let context = CallContext::new();
        let span = info_span!(
            "make_vapi_call",
            request_id = %context.request_id,
            received_at = %context.timestamp.to_rfc3339(),
            provider = %self.provider.name(),
            assistant = %request.assistant,
        );

        async {
            let result = self.dispatch(request).await;
            info!(
                success = result.is_success(),
                elapsed_ms = context.elapsed_ms(),
                "make_vapi_call finished"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, request: CallRequest) -> CallResult {
        let resolved = match self.config.resolve(request.assistant) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, "Call rejected: configuration incomplete");
                return config_failure(e).into();
            }
        };

        let body = CreateCallBody {
            assistant_id: resolved.assistant_id.to_string(),
            phone_number_id: resolved.phone_number_id.to_string(),
            customer: Customer {
                number: request.destination_phone_number.clone(),
                name: request.customer_name.clone(),
            },
        };

        let initiated = match self.provider.create_call(resolved.api_key, &body).await {
            Ok(call) => call,
            Err(e) => {
                warn!(error = %e, "Call initiation failed");
                return provider_failure(&request, e).into();
            }
        };

        info!(call_id = %initiated.id, status = ?initiated.status, "Call initiated");

        let enrichment = self.fetch_details(resolved.api_key, &initiated.id).await;
        merge(&request, &resolved, initiated, enrichment).into()
    }

    /// Wait, then read the call back once
    async fn fetch_details(&self, api_key: &Secret, call_id: &str) -> Enrichment {
        let settings = self.config.enrichment;
        if !settings.enabled {
            return Enrichment::Skipped;
        }

        if !settings.delay.is_zero() {
            tokio::time::sleep(settings.delay).await;
        }

        match self.provider.get_call(api_key, call_id).await {
            Ok(call) => Enrichment::Fetched(call),
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Call details fetch failed");
                Enrichment::Failed(e)
            }
        }
    }
}

/// Combine the initiation response with fetched details.
///
/// Fetched values win where present. Details for a different call id are
/// ignored.
pub fn merge(
    request: &CallRequest,
    resolved: &ResolvedCallConfig<'_>,
    initiated: ProviderCall,
    enrichment: Enrichment,
) -> CallSuccess {
    let details = match enrichment {
        Enrichment::Fetched(details) if details.id == initiated.id => Some(details),
        Enrichment::Fetched(details) => {
            warn!(expected = %initiated.id, got = %details.id, "Ignoring details for a different call");
            None
        }
        Enrichment::Skipped | Enrichment::Failed(_) => None,
    };

    let details_fetched = details.is_some();
    let call = match details {
        Some(details) => ProviderCall {
            id: initiated.id,
            status: details.status.or(initiated.status),
            transcript: details.transcript.or(initiated.transcript),
            cost: details.cost.or(initiated.cost),
            created_at: details.created_at.or(initiated.created_at),
            started_at: details.started_at.or(initiated.started_at),
            ended_at: details.ended_at.or(initiated.ended_at),
            ended_reason: details.ended_reason.or(initiated.ended_reason),
            raw: details.raw,
        },
        None => initiated,
    };

    let duration_seconds = call.duration_seconds();

    CallSuccess {
        message: format!(
            "Call successfully initiated to {}",
            request.destination_phone_number
        ),
        call_id: call.id,
        status: call.status,
        assistant_used: request.assistant,
        assistant_id: resolved.assistant_id.to_string(),
        phone_id: resolved.phone_number_id.to_string(),
        customer_number: request.destination_phone_number.clone(),
        customer_name: request.customer_name.clone(),
        transcript: call.transcript,
        duration_seconds,
        cost: call.cost,
        created_at: call.created_at,
        started_at: call.started_at,
        ended_at: call.ended_at,
        ended_reason: call.ended_reason,
        details_fetched,
        raw_response: call.raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnrichmentConfig;
    use crate::{AssistantSelector, ErrorKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Fake provider that records requests and replays canned responses
    #[derive(Default)]
    struct FakeProvider {
        created: Mutex<Vec<(String, CreateCallBody)>>,
        fetched: Mutex<Vec<String>>,
        fail_create: Option<u16>,
        fail_get: bool,
        next_id: Mutex<u32>,
    }

    #[async_trait]
    impl CallProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn create_call(
            &self,
            api_key: &Secret,
            body: &CreateCallBody,
        ) -> Result<ProviderCall, ProviderError> {
            self.created
                .lock()
                .push((api_key.expose().to_string(), body.clone()));

            if let Some(status) = self.fail_create {
                return Err(ProviderError::from_status(
                    status,
                    r#"{"message":"Bad Request"}"#,
                ));
            }

            let id = {
                let mut next = self.next_id.lock();
                *next += 1;
                format!("call-{}", *next)
            };
            ProviderCall::from_value(json!({ "id": id, "status": "queued" }))
        }

        async fn get_call(&self, _api_key: &Secret, call_id: &str) -> Result<ProviderCall, ProviderError> {
            self.fetched.lock().push(call_id.to_string());

            if self.fail_get {
                return Err(ProviderError::Network("connection reset".to_string()));
            }

            ProviderCall::from_value(json!({
                "id": call_id,
                "status": "ended",
                "transcript": "AI: Hi there",
                "cost": 0.05,
                "startedAt": "2026-01-05T10:00:00Z",
                "endedAt": "2026-01-05T10:00:42Z"
            }))
        }
    }

    fn full_config(enrich: bool) -> ProviderConfig {
        let mut assistants = HashMap::new();
        assistants.insert(AssistantSelector::Andy, "asst-andy".to_string());
        assistants.insert(AssistantSelector::Mam, "asst-mam".to_string());

        ProviderConfig {
            api_key: Some(Secret::new("sk-test")),
            assistants,
            phone_number_id: Some("phone-1".to_string()),
            enrichment: EnrichmentConfig {
                enabled: enrich,
                delay: Duration::ZERO,
            },
            ..ProviderConfig::default()
        }
    }

    fn dispatcher(config: ProviderConfig, provider: Arc<FakeProvider>) -> CallDispatcher {
        CallDispatcher::new(Arc::new(config), provider)
    }

    #[tokio::test]
    async fn test_success_echoes_request_and_provider_id() {
        let provider = Arc::new(FakeProvider::default());
        let dispatcher = dispatcher(full_config(false), provider.clone());

        let result = dispatcher
            .make_call(CallRequest::new("+15551234567").with_customer_name(Some("Ada".to_string())))
            .await;

        let success = result.as_success().expect("expected success");
        assert_eq!(success.call_id, "call-1");
        assert_eq!(success.customer_number, "+15551234567");
        assert_eq!(success.customer_name.as_deref(), Some("Ada"));
        assert_eq!(success.assistant_used, AssistantSelector::Andy);
        assert_eq!(success.assistant_id, "asst-andy");
        assert!(!success.details_fetched);

        let created = provider.created.lock();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "sk-test");
        assert_eq!(created[0].1.customer.name.as_deref(), Some("Ada"));
        assert!(provider.fetched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_mam_assistant_uses_mam_ids() {
        let provider = Arc::new(FakeProvider::default());
        let dispatcher = dispatcher(full_config(false), provider.clone());

        let result = dispatcher
            .make_call(CallRequest::new("+15551234567").with_assistant(AssistantSelector::Mam))
            .await;

        let success = result.as_success().unwrap();
        assert_eq!(success.assistant_used, AssistantSelector::Mam);
        assert_eq!(success.assistant_id, "asst-mam");
        assert_eq!(success.phone_id, "phone-1");
        assert_eq!(provider.created.lock()[0].1.assistant_id, "asst-mam");
    }

    #[tokio::test]
    async fn test_missing_config_makes_no_network_call() {
        let provider = Arc::new(FakeProvider::default());
        let mut config = full_config(true);
        config.assistants.remove(&AssistantSelector::Mam);
        config.api_key = None;
        let dispatcher = dispatcher(config, provider.clone());

        let result = dispatcher
            .make_call(CallRequest::new("+15551234567").with_assistant(AssistantSelector::Mam))
            .await;

        let failure = result.as_failure().expect("expected failure");
        assert_eq!(failure.error_type, ErrorKind::ConfigError);
        assert!(failure.error.contains("VAPI_API_KEY"));
        assert!(failure.error.contains("MAM"));
        assert!(provider.created.lock().is_empty());
        assert!(provider.fetched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_bad_request_maps_to_api_error() {
        let provider = Arc::new(FakeProvider {
            fail_create: Some(400),
            ..FakeProvider::default()
        });
        let dispatcher = dispatcher(full_config(true), provider.clone());

        let result = dispatcher.make_call(CallRequest::new("5551234567")).await;

        let failure = result.as_failure().unwrap();
        assert_eq!(failure.error_type, ErrorKind::ApiError);
        assert_eq!(failure.error_code, "invalid_phone");
        assert_eq!(failure.status_code, Some(400));
        assert!(!failure.suggestion.is_empty());
        // No details fetch after a failed initiation
        assert!(provider.fetched.lock().is_empty());
    }

    #[tokio::test]
    async fn test_enrichment_merges_details() {
        let provider = Arc::new(FakeProvider::default());
        let dispatcher = dispatcher(full_config(true), provider.clone());

        let result = dispatcher.make_call(CallRequest::new("+15551234567")).await;

        let success = result.as_success().unwrap();
        assert!(success.details_fetched);
        assert_eq!(success.status.as_deref(), Some("ended"));
        assert_eq!(success.transcript.as_deref(), Some("AI: Hi there"));
        assert_eq!(success.duration_seconds, Some(42.0));
        assert_eq!(success.cost, Some(0.05));
        assert_eq!(*provider.fetched.lock(), vec!["call-1".to_string()]);
    }

    #[tokio::test]
    async fn test_enrichment_failure_keeps_success() {
        let provider = Arc::new(FakeProvider {
            fail_get: true,
            ..FakeProvider::default()
        });
        let dispatcher = dispatcher(full_config(true), provider.clone());

        let result = dispatcher.make_call(CallRequest::new("+15551234567")).await;

        let success = result.as_success().expect("enrichment failure must not fail the call");
        assert_eq!(success.call_id, "call-1");
        assert_eq!(success.status.as_deref(), Some("queued"));
        assert!(!success.details_fetched);
        assert!(success.transcript.is_none());
        assert!(success.duration_seconds.is_none());
    }

    #[tokio::test]
    async fn test_identical_calls_are_not_deduplicated() {
        let provider = Arc::new(FakeProvider::default());
        let dispatcher = dispatcher(full_config(false), provider.clone());

        let first = dispatcher.make_call(CallRequest::new("+15551234567")).await;
        let second = dispatcher.make_call(CallRequest::new("+15551234567")).await;

        assert_ne!(
            first.as_success().unwrap().call_id,
            second.as_success().unwrap().call_id
        );
        assert_eq!(provider.created.lock().len(), 2);
    }

    #[test]
    fn test_merge_ignores_details_for_other_call() {
        let config = full_config(true);
        let resolved = config.resolve(AssistantSelector::Andy).unwrap();
        let request = CallRequest::new("+15551234567");
        let initiated = ProviderCall::from_value(json!({ "id": "call-1", "status": "queued" })).unwrap();
        let other = ProviderCall::from_value(json!({ "id": "call-2", "status": "ended" })).unwrap();

        let success = merge(&request, &resolved, initiated, Enrichment::Fetched(other));
        assert_eq!(success.call_id, "call-1");
        assert_eq!(success.status.as_deref(), Some("queued"));
        assert!(!success.details_fetched);
    }
}
