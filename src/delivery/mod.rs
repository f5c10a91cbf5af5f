/// Resilient Delivery Unit
///
/// Bounded-retry, exponential-backoff message delivery against the chat
/// transport. Attempts run strictly sequentially; every failure path folds
/// into the returned outcome, so `deliver` never errors toward its caller.

// Transport seam: trait, structured error, reqwest implementation
pub mod transport;

// Upstream AI response extraction with fixed fallback
pub mod extract;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use transport::{HttpTransport, MessageTransport, TransportError};

/// A single logical message to deliver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Destination identity (chat id / phone-derived id)
    pub recipient_id: String,
    /// Logical session bucket for the transport
    pub session_label: String,
    /// Message body; callers substitute the fixed fallback before building
    /// a request, so this is never empty
    pub message_text: String,
}

impl DeliveryRequest {
    pub fn new(recipient_id: impl Into<String>, message_text: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            session_label: "default".to_string(),
            message_text: message_text.into(),
        }
    }

    pub fn with_session(mut self, session_label: impl Into<String>) -> Self {
        self.session_label = session_label.into();
        self
    }

    /// Wire payload for the transport's send-text endpoint
    pub fn to_payload(&self) -> Value {
        json!({
            "session": self.session_label,
            "chatId": self.recipient_id,
            "text": self.message_text,
        })
    }
}

/// Backoff schedule and retry budget
///
/// Attempt k (1-indexed beyond the first) waits `backoff_delays_ms[k-1]`
/// first; indexes past the schedule reuse its last value, and an empty
/// schedule falls back to the 8s floor for every wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (3 means up to 4 calls total)
    pub max_retries: u32,
    /// Waits between successive attempts, in milliseconds
    pub backoff_delays_ms: Vec<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_delays_ms: vec![2_000, 4_000, 8_000],
        }
    }
}

impl RetryPolicy {
    /// Wait used when the schedule has nothing to say
    pub const FLOOR_DELAY_MS: u64 = 8_000;

    /// Delay observed before attempt `attempt` (1-indexed beyond the first)
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let ms = self
            .backoff_delays_ms
            .get(attempt as usize - 1)
            .or_else(|| self.backoff_delays_ms.last())
            .copied()
            .unwrap_or(Self::FLOOR_DELAY_MS);
        Duration::from_millis(ms)
    }
}

/// Outcome of one delivery attempt sequence
///
/// Immutable once constructed; exactly one downstream branch consumes it
/// based on `sent`. A `sent = true` outcome means the transport acknowledged
/// the message at least once — an earlier attempt that timed out after
/// actually landing may still have produced a duplicate, so acknowledged
/// delivery is at-least-once, never exactly-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Whether delivery succeeded within the retry budget
    pub sent: bool,
    /// Attempt index on success (0 = first try); attempts actually made on
    /// failure (equals the full budget when exhausted, less when a client
    /// error short-circuited)
    pub retry_count: u32,
    /// Transport-assigned identifier, when the success response carried one
    pub message_id: Option<String>,
    /// Last observed error description, present only when `sent` is false
    pub failure_reason: Option<String>,
}

/// The delivery unit: a transport plus a retry policy
pub struct DeliveryUnit {
    transport: Arc<dyn MessageTransport>,
    policy: RetryPolicy,
}

impl DeliveryUnit {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(transport: Arc<dyn MessageTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Attempt delivery with bounded retries and exponential backoff
    ///
    /// One network call per attempt, never concurrent: each attempt's
    /// classification decides whether the next one happens. A status in
    /// [400, 500) stops the loop immediately; anything else retries until
    /// the budget runs out.
    pub async fn deliver(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        let payload = request.to_payload();
        let idempotency_key = Uuid::new_v4().to_string();
        let mut last_error: Option<String> = None;
        let mut attempts_made = 0u32;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = self.policy.delay_before(attempt);
                tracing::debug!(
                    "⏳ Backing off {:?} before attempt {}/{}",
                    delay,
                    attempt + 1,
                    self.policy.max_retries + 1
                );
                tokio::time::sleep(delay).await;
            }

            match self.transport.send_text(&payload, &idempotency_key).await {
                Ok(response) => {
                    let message_id = extract_message_id(&response);
                    tracing::info!(
                        "✅ Delivered to {} (attempt {}, message id: {:?})",
                        request.recipient_id,
                        attempt + 1,
                        message_id
                    );
                    return DeliveryOutcome {
                        sent: true,
                        retry_count: attempt,
                        message_id,
                        failure_reason: None,
                    };
                }
                Err(error) => {
                    attempts_made = attempt + 1;
                    tracing::warn!(
                        "⚠️ Attempt {} failed for {}: {}",
                        attempt + 1,
                        request.recipient_id,
                        error
                    );
                    let terminal = error.is_terminal();
                    last_error = Some(error.message);
                    if terminal {
                        tracing::error!(
                            "❌ Client error from transport, not retrying {}",
                            request.recipient_id
                        );
                        break;
                    }
                }
            }
        }

        tracing::error!(
            "❌ Delivery to {} failed after {} attempt(s)",
            request.recipient_id,
            attempts_made
        );
        DeliveryOutcome {
            sent: false,
            retry_count: attempts_made,
            message_id: None,
            failure_reason: Some(
                last_error.unwrap_or_else(|| "unknown delivery failure".to_string()),
            ),
        }
    }
}

/// Transport-assigned id, probed under both field names the endpoint is
/// known to answer with; first non-null wins.
fn extract_message_id(response: &Value) -> Option<String> {
    ["id", "messageId"].iter().find_map(|key| match response.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
