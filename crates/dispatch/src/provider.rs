//! Outbound provider client.
//!
//! [`WebhookProvider`] POSTs the notification payload as JSON to a
//! configured URL. Responses with status 200 or 202 count as success;
//! 5xx and 429 are retryable failures; any other 4xx is permanent.
//! Transport-level failures (no response) are always retryable.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use courier_core::provider::{ProviderError, ProviderRequest, ProviderResponse};

/// Sends notifications to the external provider.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn send(&self, req: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

/// HTTP webhook provider adapter.
pub struct WebhookProvider {
    client: reqwest::Client,
    url: String,
}

impl WebhookProvider {
    /// Create a provider client with a per-request timeout.
    ///
    /// Panics if the HTTP client cannot be constructed, which only happens
    /// on malformed TLS configuration and is a startup-time failure.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Provider for WebhookProvider {
    async fn send(&self, req: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(req)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(format!("failed to read response body: {e}")))?;

        if !matches!(status, 200 | 202) {
            return Err(ProviderError::from_status(status, body));
        }

        // Providers are not required to return a parseable body. When the
        // body is missing or malformed, synthesize a message id from the
        // local clock and treat the send as accepted. A body that parses
        // is returned as-is, whatever its fields hold.
        match serde_json::from_str::<ProviderResponse>(&body) {
            Ok(resp) => Ok(resp),
            Err(_) => Ok(synthesized_response()),
        }
    }
}

fn synthesized_response() -> ProviderResponse {
    ProviderResponse {
        message_id: format!(
            "msg-{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ),
        status: "accepted".to_string(),
        timestamp: Utc::now(),
    }
}
