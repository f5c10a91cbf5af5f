/// The binary routing step over a delivery outcome
///
/// Pure record construction: every invocation yields a conversation record
/// plus exactly one branch (a success log, or a failure record with its
/// failure log). Nothing here touches storage, so callers are free to
/// persist the pieces in any order.

use crate::delivery::extract::ExtractedResponse;
use crate::delivery::DeliveryOutcome;
use crate::pipeline::records::{
    ConversationRecord, ExecutionLogRecord, ExecutionStatus, FailedMessageRecord, TurnContext,
};
use chrono::Utc;
use serde_json::json;

/// Everything a finished turn must persist
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedTurn {
    /// Written for every turn regardless of delivery result
    pub conversation: ConversationRecord,
    pub branch: RoutedBranch,
}

/// Exactly one of these exists per turn
#[derive(Debug, Clone, PartialEq)]
pub enum RoutedBranch {
    Success {
        log: ExecutionLogRecord,
    },
    Failure {
        failed: FailedMessageRecord,
        log: ExecutionLogRecord,
    },
}

/// Shape all records for a finished turn
pub fn route_outcome(
    ctx: &TurnContext,
    response: &ExtractedResponse,
    outcome: &DeliveryOutcome,
    workflow_name: &str,
    execution_id: &str,
) -> RoutedTurn {
    let conversation = ConversationRecord {
        chat_id: ctx.chat_id.clone(),
        user_id: ctx.user_id.clone(),
        user_message: ctx.user_message.clone(),
        bot_response: response.text.clone(),
        detected_language: ctx.detected_language.clone(),
        faq_matched: ctx.faq_matched,
        sent: outcome.sent,
    };

    let branch = if outcome.sent {
        RoutedBranch::Success {
            log: success_log(ctx, response, outcome, workflow_name, execution_id),
        }
    } else {
        RoutedBranch::Failure {
            failed: failed_message(ctx, response, outcome),
            log: failure_log(ctx, outcome, workflow_name, execution_id),
        }
    };

    RoutedTurn { conversation, branch }
}

fn success_log(
    ctx: &TurnContext,
    response: &ExtractedResponse,
    outcome: &DeliveryOutcome,
    workflow_name: &str,
    execution_id: &str,
) -> ExecutionLogRecord {
    ExecutionLogRecord {
        execution_id: execution_id.to_string(),
        workflow_name: workflow_name.to_string(),
        chat_id: ctx.chat_id.clone(),
        user_id: ctx.user_id.clone(),
        phone_number: ctx.chat_id.clone(),
        status: ExecutionStatus::Success,
        execution_data: json!({
            "isKnownUser": ctx.known_user,
            "userName": ctx.user_name,
            "userPreferredLanguage": ctx.preferred_language,
            "faqLoaded": ctx.faq_loaded,
            "historyCount": ctx.history_count,
            "messageLength": ctx.user_message.len(),
            "responseLength": response.text.len(),
            "aiFailed": response.ai_failed,
            "retryCount": outcome.retry_count,
            "transportMessageId": outcome.message_id,
            "executionTime": Utc::now().to_rfc3339(),
        }),
    }
}

fn failure_log(
    ctx: &TurnContext,
    outcome: &DeliveryOutcome,
    workflow_name: &str,
    execution_id: &str,
) -> ExecutionLogRecord {
    ExecutionLogRecord {
        execution_id: execution_id.to_string(),
        workflow_name: workflow_name.to_string(),
        chat_id: ctx.chat_id.clone(),
        user_id: ctx.user_id.clone(),
        phone_number: ctx.chat_id.clone(),
        status: ExecutionStatus::FailedAfterRetries,
        execution_data: json!({
            "isKnownUser": ctx.known_user,
            "userName": ctx.user_name,
            "userPreferredLanguage": ctx.preferred_language,
            "faqLoaded": ctx.faq_loaded,
            "historyCount": ctx.history_count,
            "retryCount": outcome.retry_count,
            "errorReason": outcome.failure_reason,
            "executionTime": Utc::now().to_rfc3339(),
        }),
    }
}

fn failed_message(
    ctx: &TurnContext,
    response: &ExtractedResponse,
    outcome: &DeliveryOutcome,
) -> FailedMessageRecord {
    FailedMessageRecord {
        chat_id: ctx.chat_id.clone(),
        user_id: ctx.user_id.clone(),
        message_payload: json!({
            "session": ctx.session_label,
            "chatId": ctx.chat_id,
            "userMessage": ctx.user_message,
        }),
        response_text: response.text.clone(),
        failure_reason: outcome
            .failure_reason
            .clone()
            .unwrap_or_else(|| "Unknown error after retries".to_string()),
        retry_count: outcome.retry_count,
        last_retry_at: Utc::now(),
    }
}
