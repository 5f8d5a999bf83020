//! Database models for chat messages and content chunks.

use crate::api::models::messages::{MessageRole, UsageInfo};
use crate::types::{ChatId, ChunkId, MessageId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Database request for appending a message to a chat.
///
/// `created_at` is always server-assigned on insert; callers never supply it.
#[derive(Debug, Clone)]
pub struct MessageCreateDBRequest {
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    pub file_ids: Option<Vec<Uuid>>,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub usage: Option<UsageInfo>,
    pub metadata: Option<Value>,
}

impl MessageCreateDBRequest {
    pub fn new(chat_id: ChatId, role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            chat_id,
            role,
            content: content.into(),
            file_ids: None,
            tool_calls: None,
            tool_results: None,
            usage: None,
            metadata: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageInfo) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Database response for a message, with chunked content already reassembled.
#[derive(Debug, Clone)]
pub struct MessageDBResponse {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    pub file_ids: Option<Vec<Uuid>>,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub usage: Option<UsageInfo>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// One ordered fragment of a chunked message's content.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageChunkDBResponse {
    pub id: ChunkId,
    pub message_id: MessageId,
    pub chunk_index: i64,
    pub content: String,
}

/// A single page of a chat's history, ascending by creation time.
#[derive(Debug, Clone)]
pub struct MessagePageDB {
    pub messages: Vec<MessageDBResponse>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub has_more: bool,
}

/// Field-wise sum of usage over all of a chat's messages.
///
/// `estimated` is true iff any contributing message carried estimated usage.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSummaryDB {
    pub chat_id: ChatId,
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub tokens_total: i64,
    pub tokens_cached: i64,
    pub cost_input: f64,
    pub cost_output: f64,
    pub cost_total: f64,
    pub estimated: bool,
}
