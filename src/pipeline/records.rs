/// Durable record types for finished turns
///
/// One conversation record per turn, a failure record when delivery gave up,
/// and an execution-log record either way. Each maps one-to-one onto an
/// insert-only Postgres table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-turn context threaded explicitly between pipeline stages
///
/// Each stage receives exactly the fields it needs instead of reaching into
/// a shared name-keyed namespace of sibling results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnContext {
    /// Destination chat identity
    pub chat_id: String,
    /// Internal user id, when the sender is a known user
    pub user_id: Option<String>,
    /// Transport session bucket
    pub session_label: String,
    /// The inbound user message that started the turn
    pub user_message: String,
    /// Language tagged on the conversation record
    pub detected_language: String,
    /// Whether the FAQ matcher claimed this turn
    pub faq_matched: bool,
    /// Whether the sender was recognized
    pub known_user: bool,
    pub user_name: Option<String>,
    pub preferred_language: Option<String>,
    /// Whether FAQ data was available to the AI stage
    pub faq_loaded: bool,
    /// Prior turns merged into the AI context
    pub history_count: u32,
}

impl TurnContext {
    /// Minimal context for an unrecognized sender
    pub fn anonymous(chat_id: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            user_id: None,
            session_label: "default".to_string(),
            user_message: user_message.into(),
            detected_language: "en".to_string(),
            faq_matched: true,
            known_user: false,
            user_name: None,
            preferred_language: None,
            faq_loaded: false,
            history_count: 0,
        }
    }
}

/// One row for the conversation history table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub chat_id: String,
    pub user_id: Option<String>,
    pub user_message: String,
    pub bot_response: String,
    pub detected_language: String,
    pub faq_matched: bool,
    /// Whether the response actually reached the transport
    pub sent: bool,
}

/// One row for the failed-messages table
///
/// Holds enough of the original payload for an operator replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedMessageRecord {
    pub chat_id: String,
    pub user_id: Option<String>,
    /// The original request shape: `{session, chatId, userMessage}`
    pub message_payload: Value,
    /// The response text that never made it out
    pub response_text: String,
    pub failure_reason: String,
    pub retry_count: u32,
    pub last_retry_at: DateTime<Utc>,
}

/// Terminal status of one end-to-end run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    FailedAfterRetries,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::FailedAfterRetries => "failed_after_retries",
        }
    }
}

/// One row for the execution log table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogRecord {
    pub execution_id: String,
    pub workflow_name: String,
    pub chat_id: String,
    pub user_id: Option<String>,
    pub phone_number: String,
    pub status: ExecutionStatus,
    /// Contextual metrics blob, stored as JSON
    pub execution_data: Value,
}
