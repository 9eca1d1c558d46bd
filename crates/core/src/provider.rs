//! Outbound provider request/response shapes and error classification.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Payload POSTed to the external provider.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    pub to: String,
    pub channel: String,
    pub content: String,
}

/// Provider acknowledgement. The provider may return an empty or
/// unparseable body on success, in which case the caller synthesizes a
/// message id from the local clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(rename = "messageId", default)]
    pub message_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: Timestamp,
}

/// A failed provider call.
///
/// `status_code` is `None` for transport-level failures (no response at
/// all), which are always retryable.
#[derive(Debug, Clone, thiserror::Error)]
#[error("provider error (status {status_code:?}): {message}")]
pub struct ProviderError {
    pub status_code: Option<u16>,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    /// A transport failure: no HTTP response was received.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// Classify an HTTP status response. 5xx and 429 are retryable;
    /// any other 4xx is permanent.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
            retryable: status_code >= 500 || status_code == 429,
        }
    }
}
