//! API request/response models for chat messages and usage accounting.

use crate::db::models::messages::{MessageDBResponse, MessagePageDB, UsageSummaryDB};
use crate::types::{ChatId, MessageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Who produced a message turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// Model token counts for a single message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub input: i64,
    pub output: i64,
    /// Equals `input + output` unless the whole record is estimated
    pub total: i64,
    pub cached: i64,
}

/// Cost breakdown for a single message, in the provider's billing currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CostBreakdown {
    pub input: f64,
    pub output: f64,
    pub total: f64,
}

/// Per-message accounting of consumed model tokens and cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageInfo {
    pub provider: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub tokens: TokenUsage,
    #[serde(default)]
    pub cost: CostBreakdown,
    pub latency_ms: Option<i64>,
    /// True when counts were inferred rather than reported by the provider
    #[serde(default)]
    pub estimated: bool,
}

/// Request body for appending a message to a chat.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageCreate {
    pub role: MessageRole,
    pub content: String,
    /// Referenced uploaded files, by id
    pub file_ids: Option<Vec<Uuid>>,
    pub tool_calls: Option<Value>,
    pub tool_results: Option<Value>,
    pub usage: Option<UsageInfo>,
    /// Free-form key-value bag; contents are documented but not type-checked
    pub metadata: Option<Value>,
}

/// A single message turn.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: MessageId,
    #[schema(value_type = String, format = "uuid")]
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageDBResponse> for MessageResponse {
    fn from(db: MessageDBResponse) -> Self {
        Self {
            id: db.id,
            chat_id: db.chat_id,
            role: db.role,
            content: db.content,
            file_ids: db.file_ids,
            tool_calls: db.tool_calls,
            tool_results: db.tool_results,
            usage: db.usage,
            metadata: db.metadata,
            created_at: db.created_at,
        }
    }
}

/// Response envelope for the paginated history listing.
///
/// Serialized with camelCase keys (`sessionId`, `pageSize`, `hasMore`) for
/// compatibility with existing frontend clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessagePageResponse {
    #[schema(value_type = String, format = "uuid")]
    pub session_id: ChatId,
    pub messages: Vec<MessageResponse>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub has_more: bool,
}

impl MessagePageResponse {
    pub fn new(session_id: ChatId, page: MessagePageDB) -> Self {
        Self {
            session_id,
            messages: page.messages.into_iter().map(MessageResponse::from).collect(),
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            has_more: page.has_more,
        }
    }
}

/// Chat-level usage rollup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageSummaryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub session_id: ChatId,
    pub tokens: TokenUsage,
    pub cost: CostBreakdown,
    /// True iff any contributing message carried estimated usage
    pub estimated: bool,
}

impl From<UsageSummaryDB> for UsageSummaryResponse {
    fn from(db: UsageSummaryDB) -> Self {
        Self {
            session_id: db.chat_id,
            tokens: TokenUsage {
                input: db.tokens_input,
                output: db.tokens_output,
                total: db.tokens_total,
                cached: db.tokens_cached,
            },
            cost: CostBreakdown {
                input: db.cost_input,
                output: db.cost_output,
                total: db.cost_total,
            },
            estimated: db.estimated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_envelope_uses_camel_case_keys() {
        let page = MessagePageResponse {
            session_id: uuid::Uuid::new_v4(),
            messages: vec![],
            page: 2,
            page_size: 10,
            total: 15,
            has_more: false,
        };
        let json = serde_json::to_value(&page).unwrap();
        let object = json.as_object().unwrap();
        for key in ["sessionId", "messages", "page", "pageSize", "total", "hasMore"] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert!(!object.contains_key("session_id"));
        assert!(!object.contains_key("has_more"));
    }
}
