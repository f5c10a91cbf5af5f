/// Chat-transport seam for the delivery unit
///
/// A single attempt is one POST of `{session, chatId, text}` against the
/// transport's send-text endpoint. The trait exists so the retry loop can be
/// exercised without a network; the reqwest-backed implementation is what
/// production uses.

use crate::config::TransportConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Transport-level failure for one delivery attempt
///
/// Carries the HTTP status when one was observed so the retry loop can
/// classify the failure. Timeouts and connection resets have no status.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Human-readable description, surfaced as the outcome's failure reason
    pub message: String,
    /// HTTP status code, when the endpoint answered at all
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// Client errors never succeed on retry; the request itself is wrong
    /// (bad key, bad recipient). Everything else is treated as transient.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Some(code) if (400..500).contains(&code))
    }
}

/// One delivery attempt against the chat transport
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send the wire payload once and return the endpoint's parsed JSON
    /// response. The idempotency key is constant across the retries of a
    /// single logical delivery.
    async fn send_text(&self, payload: &Value, idempotency_key: &str)
        -> Result<Value, TransportError>;
}

/// reqwest-backed transport with API-key auth and a fixed per-call timeout
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl MessageTransport for HttpTransport {
    async fn send_text(
        &self,
        payload: &Value,
        idempotency_key: &str,
    ) -> Result<Value, TransportError> {
        tracing::debug!("🌐 POST {} (idempotency key: {})", self.url, idempotency_key);

        let response = self
            .client
            .post(&self.url)
            .header("X-Api-Key", &self.api_key)
            .header("X-Idempotency-Key", idempotency_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| TransportError::new(format!("transport request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::with_status(
                status.as_u16(),
                format!("transport returned HTTP {}: {}", status.as_u16(), body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::new(format!("invalid transport response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_in_client_error_range_is_terminal() {
        assert!(TransportError::with_status(400, "bad request").is_terminal());
        assert!(TransportError::with_status(401, "unauthorized").is_terminal());
        assert!(TransportError::with_status(499, "client closed").is_terminal());
    }

    #[test]
    fn server_errors_and_missing_status_are_transient() {
        assert!(!TransportError::with_status(500, "boom").is_terminal());
        assert!(!TransportError::with_status(503, "unavailable").is_terminal());
        assert!(!TransportError::new("request timed out").is_terminal());
    }
}
