//! Vapi HTTP client
//!
//! Places calls with `POST /call/phone` and reads them back with
//! `GET /call/{id}`, authenticating with a bearer API key.

use super::{CallProvider, CreateCallBody, ProviderCall, ProviderError};
use crate::config::ProviderConfig;
use crate::Secret;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Vapi REST API client
#[derive(Debug, Clone)]
pub struct VapiClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl VapiClient {
    /// Create a client for the configured base URL and timeout
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(concat!("vapi-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.timeout,
        })
    }

    /// Join a path onto the base URL, keeping any base path prefix
    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        let joined = format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ProviderError::Client(format!("Invalid endpoint URL: {}", e)))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    /// Send an authenticated request and decode a call object
    async fn send(&self, request: RequestBuilder, api_key: &Secret) -> Result<ProviderCall, ProviderError> {
        let response = request
            .bearer_auth(api_key.expose())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        debug!(status = status.as_u16(), "Vapi responded");

        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &text));
        }

        let raw: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::InvalidResponse(format!("response is not JSON: {}", e)))?;

        ProviderCall::from_value(raw)
    }
}

#[async_trait]
impl CallProvider for VapiClient {
    fn name(&self) -> &str {
        "vapi"
    }

    async fn create_call(
        &self,
        api_key: &Secret,
        body: &CreateCallBody,
    ) -> Result<ProviderCall, ProviderError> {
        let url = self.endpoint("call/phone")?;
        self.send(self.client.post(url).json(body), api_key).await
    }

    async fn get_call(&self, api_key: &Secret, call_id: &str) -> Result<ProviderCall, ProviderError> {
        let mut url = self.endpoint("call")?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::Client("Base URL cannot have path segments".to_string()))?
            .push(call_id);
        self.send(self.client.get(url), api_key).await
    }
}
