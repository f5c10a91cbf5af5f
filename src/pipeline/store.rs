/// Postgres persistence with continue-on-error semantics
///
/// All three tables are insert-only from this process. A failed insert is
/// logged and swallowed: storage trouble must never turn a delivered
/// message into a failed turn, and must never stop the failure branch from
/// recording what it still can.

use crate::pipeline::records::{ConversationRecord, ExecutionLogRecord, FailedMessageRecord};
use crate::pipeline::routing::{RoutedBranch, RoutedTurn};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_postgres::{Client, NoTls};

/// Insert-only store over the three delivery tables
pub struct DeliveryStore {
    client: Client,
}

/// One replayable row out of the failed-messages table
#[derive(Debug, Clone)]
pub struct FailedMessageRow {
    pub id: i64,
    pub chat_id: String,
    pub user_id: Option<String>,
    pub message_payload: Value,
    pub response_text: String,
    pub retry_count: i32,
    pub last_retry_at: DateTime<Utc>,
}

impl DeliveryStore {
    /// Connect and spawn the connection driver task
    pub async fn connect(database_url: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("❌ Postgres connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Create the three tables if they are missing
    ///
    /// Safe to call repeatedly; every statement uses IF NOT EXISTS.
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS conversation_history (
                    id BIGSERIAL PRIMARY KEY,
                    chat_id TEXT NOT NULL,
                    user_id TEXT,
                    user_message TEXT NOT NULL,
                    bot_response TEXT NOT NULL,
                    detected_language TEXT NOT NULL DEFAULT 'en',
                    faq_matched BOOLEAN NOT NULL DEFAULT TRUE,
                    sent BOOLEAN NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE IF NOT EXISTS failed_messages (
                    id BIGSERIAL PRIMARY KEY,
                    chat_id TEXT NOT NULL,
                    user_id TEXT,
                    message_payload JSONB NOT NULL,
                    response_text TEXT NOT NULL,
                    failure_reason TEXT NOT NULL,
                    retry_count INTEGER NOT NULL,
                    last_retry_at TIMESTAMPTZ NOT NULL
                );

                CREATE TABLE IF NOT EXISTS execution_logs (
                    id BIGSERIAL PRIMARY KEY,
                    execution_id TEXT NOT NULL,
                    workflow_name TEXT NOT NULL,
                    chat_id TEXT NOT NULL,
                    user_id TEXT,
                    phone_number TEXT NOT NULL,
                    status TEXT NOT NULL,
                    execution_data JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );
                "#,
            )
            .await?;

        Ok(())
    }

    /// Persist a routed turn: the conversation record plus its branch
    pub async fn persist_turn(&self, turn: &RoutedTurn) {
        self.store_conversation(&turn.conversation).await;

        match &turn.branch {
            RoutedBranch::Success { log } => {
                self.store_execution_log(log).await;
            }
            RoutedBranch::Failure { failed, log } => {
                self.store_failed_message(failed).await;
                self.store_execution_log(log).await;
            }
        }
    }

    pub async fn store_conversation(&self, record: &ConversationRecord) {
        let result = self
            .client
            .execute(
                r#"
                INSERT INTO conversation_history
                    (chat_id, user_id, user_message, bot_response, detected_language, faq_matched, sent)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &record.chat_id,
                    &record.user_id,
                    &record.user_message,
                    &record.bot_response,
                    &record.detected_language,
                    &record.faq_matched,
                    &record.sent,
                ],
            )
            .await;

        match result {
            Ok(_) => tracing::debug!("💾 Stored conversation record for {}", record.chat_id),
            Err(e) => tracing::error!(
                "❌ Conversation insert failed for {} (continuing): {}",
                record.chat_id,
                e
            ),
        }
    }

    pub async fn store_failed_message(&self, record: &FailedMessageRecord) {
        let retry_count = record.retry_count as i32;
        let result = self
            .client
            .execute(
                r#"
                INSERT INTO failed_messages
                    (chat_id, user_id, message_payload, response_text, failure_reason, retry_count, last_retry_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &record.chat_id,
                    &record.user_id,
                    &record.message_payload,
                    &record.response_text,
                    &record.failure_reason,
                    &retry_count,
                    &record.last_retry_at,
                ],
            )
            .await;

        match result {
            Ok(_) => tracing::debug!("💾 Stored failed message for {}", record.chat_id),
            Err(e) => tracing::error!(
                "❌ Failed-message insert failed for {} (continuing): {}",
                record.chat_id,
                e
            ),
        }
    }

    pub async fn store_execution_log(&self, record: &ExecutionLogRecord) {
        let status = record.status.as_str();
        let result = self
            .client
            .execute(
                r#"
                INSERT INTO execution_logs
                    (execution_id, workflow_name, chat_id, user_id, phone_number, status, execution_data)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &record.execution_id,
                    &record.workflow_name,
                    &record.chat_id,
                    &record.user_id,
                    &record.phone_number,
                    &status,
                    &record.execution_data,
                ],
            )
            .await;

        match result {
            Ok(_) => tracing::debug!(
                "💾 Stored execution log {} ({})",
                record.execution_id,
                record.status.as_str()
            ),
            Err(e) => tracing::error!(
                "❌ Execution-log insert failed for {} (continuing): {}",
                record.execution_id,
                e
            ),
        }
    }

    /// Rows pending operator redelivery, oldest first
    pub async fn load_failed_messages(&self, limit: i64) -> Result<Vec<FailedMessageRow>> {
        let rows = self
            .client
            .query(
                r#"
                SELECT id, chat_id, user_id, message_payload, response_text, retry_count, last_retry_at
                FROM failed_messages
                ORDER BY last_retry_at ASC
                LIMIT $1
                "#,
                &[&limit],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| FailedMessageRow {
                id: row.get("id"),
                chat_id: row.get("chat_id"),
                user_id: row.get("user_id"),
                message_payload: row.get("message_payload"),
                response_text: row.get("response_text"),
                retry_count: row.get("retry_count"),
                last_retry_at: row.get("last_retry_at"),
            })
            .collect())
    }
}
