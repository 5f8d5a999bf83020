//! Database repository for chat messages.
//!
//! Large message bodies are stored split across `message_chunks` rows. When a
//! message is chunked its own `content` column is empty and the chunk rows are
//! the source of truth; readers reassemble them and verify the index sequence
//! is gapless before returning the message.

use crate::api::models::messages::{CostBreakdown, MessageRole, TokenUsage, UsageInfo};
use crate::db::{
    errors::{DbError, Result},
    models::messages::{
        MessageChunkDBResponse, MessageCreateDBRequest, MessageDBResponse, MessagePageDB,
        UsageSummaryDB,
    },
};
use crate::types::{ChatId, MessageId, abbrev_uuid};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;
use uuid::Uuid;

/// Content at or below this many bytes is stored inline on the message row.
pub const MESSAGE_CHUNK_THRESHOLD: usize = 8192;
/// Target byte size of one chunk row, shortened where needed to land on a
/// character boundary.
pub const MESSAGE_CHUNK_SIZE: usize = 4096;

// Database entity model; content here is the raw column, not the
// reassembled body.
#[derive(Debug, Clone, FromRow)]
struct MessageRow {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    pub has_chunks: bool,
    pub file_ids: Option<Json<Vec<Uuid>>>,
    pub tool_calls: Option<Json<Value>>,
    pub tool_results: Option<Json<Value>>,
    pub usage_provider: Option<String>,
    pub usage_model: Option<String>,
    pub tokens_input: Option<i64>,
    pub tokens_output: Option<i64>,
    pub tokens_total: Option<i64>,
    pub tokens_cached: Option<i64>,
    pub cost_input: Option<f64>,
    pub cost_output: Option<f64>,
    pub cost_total: Option<f64>,
    pub latency_ms: Option<i64>,
    pub usage_estimated: bool,
    pub metadata: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
}

impl MessageRow {
    /// Usage is present iff `tokens_total` was written at insert time.
    fn usage(&self) -> Option<UsageInfo> {
        self.tokens_total?;
        Some(UsageInfo {
            provider: self.usage_provider.clone(),
            model: self.usage_model.clone(),
            tokens: TokenUsage {
                input: self.tokens_input.unwrap_or(0),
                output: self.tokens_output.unwrap_or(0),
                total: self.tokens_total.unwrap_or(0),
                cached: self.tokens_cached.unwrap_or(0),
            },
            cost: CostBreakdown {
                input: self.cost_input.unwrap_or(0.0),
                output: self.cost_output.unwrap_or(0.0),
                total: self.cost_total.unwrap_or(0.0),
            },
            latency_ms: self.latency_ms,
            estimated: self.usage_estimated,
        })
    }

    fn into_response(self, content: String) -> MessageDBResponse {
        let usage = self.usage();
        MessageDBResponse {
            id: self.id,
            chat_id: self.chat_id,
            role: self.role,
            content,
            file_ids: self.file_ids.map(|j| j.0),
            tool_calls: self.tool_calls.map(|j| j.0),
            tool_results: self.tool_results.map(|j| j.0),
            usage,
            metadata: self.metadata.map(|j| j.0),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UsageSumRow {
    pub tokens_input: i64,
    pub tokens_output: i64,
    pub tokens_total: i64,
    pub tokens_cached: i64,
    pub cost_input: f64,
    pub cost_output: f64,
    pub cost_total: f64,
    pub estimated: bool,
}

/// Splits content into chunk-sized pieces, never inside a UTF-8 character.
fn split_chunks(content: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        if rest.len() <= MESSAGE_CHUNK_SIZE {
            chunks.push(rest);
            break;
        }
        let mut end = MESSAGE_CHUNK_SIZE;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

pub struct Messages<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Messages<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Appends a message to a chat. Bodies over the chunking threshold are
    /// written as chunk rows with an empty parent `content`.
    #[instrument(skip(self, request), fields(chat_id = %abbrev_uuid(&request.chat_id), role = ?request.role, bytes = request.content.len()), err)]
    pub async fn append(&mut self, request: &MessageCreateDBRequest) -> Result<MessageDBResponse> {
        let message_id = Uuid::new_v4();
        let now = Utc::now();
        let chunked = request.content.len() > MESSAGE_CHUNK_THRESHOLD;
        let stored_content = if chunked { "" } else { request.content.as_str() };

        // Unestimated token totals are recomputed here; providers sometimes
        // report a total that drifts from input + output.
        let usage = request.usage.clone().map(|mut u| {
            if !u.estimated {
                u.tokens.total = u.tokens.input + u.tokens.output;
            }
            u
        });

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (
                id, chat_id, role, content, has_chunks,
                file_ids, tool_calls, tool_results,
                usage_provider, usage_model,
                tokens_input, tokens_output, tokens_total, tokens_cached,
                cost_input, cost_output, cost_total, latency_ms, usage_estimated,
                metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(request.chat_id)
        .bind(request.role)
        .bind(stored_content)
        .bind(chunked)
        .bind(request.file_ids.clone().map(Json))
        .bind(request.tool_calls.clone().map(Json))
        .bind(request.tool_results.clone().map(Json))
        .bind(usage.as_ref().and_then(|u| u.provider.clone()))
        .bind(usage.as_ref().and_then(|u| u.model.clone()))
        .bind(usage.as_ref().map(|u| u.tokens.input))
        .bind(usage.as_ref().map(|u| u.tokens.output))
        .bind(usage.as_ref().map(|u| u.tokens.total))
        .bind(usage.as_ref().map(|u| u.tokens.cached))
        .bind(usage.as_ref().map(|u| u.cost.input))
        .bind(usage.as_ref().map(|u| u.cost.output))
        .bind(usage.as_ref().map(|u| u.cost.total))
        .bind(usage.as_ref().and_then(|u| u.latency_ms))
        .bind(usage.as_ref().map(|u| u.estimated).unwrap_or(false))
        .bind(request.metadata.clone().map(Json))
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        if chunked {
            for (index, piece) in split_chunks(&request.content).iter().enumerate() {
                sqlx::query(
                    "INSERT INTO message_chunks (id, message_id, chunk_index, content) VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(message_id)
                .bind(index as i64)
                .bind(piece)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(row.into_response(request.content.clone()))
    }

    /// Fetches one message with its content reassembled.
    #[instrument(skip(self), fields(message_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, id: MessageId) -> Result<Option<MessageDBResponse>> {
        let row = sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        match row {
            Some(row) => Ok(Some(self.reassemble(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&chat_id)), err)]
    pub async fn count(&mut self, chat_id: ChatId) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(&mut *self.db)
            .await?;
        Ok(total)
    }

    /// Loads one page of a chat's history, ascending by creation time with
    /// insertion order breaking ties. `page` is 1-based.
    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&chat_id), page, page_size), err)]
    pub async fn load_page(&mut self, chat_id: ChatId, page: i64, page_size: i64) -> Result<MessagePageDB> {
        let total = self.count(chat_id).await?;
        // page and page_size are caller-supplied; a huge page must land past
        // the end, not overflow.
        let offset = (page - 1).saturating_mul(page_size);

        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT * FROM messages
            WHERE chat_id = $1
            ORDER BY created_at, rowid
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(chat_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&mut *self.db)
        .await?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            messages.push(self.reassemble(row).await?);
        }

        Ok(MessagePageDB {
            messages,
            page,
            page_size,
            total,
            has_more: page.checked_mul(page_size).is_some_and(|end| end < total),
        })
    }

    /// Sums usage over every message in a chat. Messages without usage
    /// contribute nothing; an empty chat sums to all zeros.
    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&chat_id)), err)]
    pub async fn usage_summary(&mut self, chat_id: ChatId) -> Result<UsageSummaryDB> {
        let row = sqlx::query_as::<_, UsageSumRow>(
            r#"
            SELECT
                COALESCE(SUM(tokens_input), 0) AS tokens_input,
                COALESCE(SUM(tokens_output), 0) AS tokens_output,
                COALESCE(SUM(tokens_total), 0) AS tokens_total,
                COALESCE(SUM(tokens_cached), 0) AS tokens_cached,
                COALESCE(SUM(cost_input), 0.0) AS cost_input,
                COALESCE(SUM(cost_output), 0.0) AS cost_output,
                COALESCE(SUM(cost_total), 0.0) AS cost_total,
                COALESCE(MAX(usage_estimated), FALSE) AS estimated
            FROM messages
            WHERE chat_id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(UsageSummaryDB {
            chat_id,
            tokens_input: row.tokens_input,
            tokens_output: row.tokens_output,
            tokens_total: row.tokens_total,
            tokens_cached: row.tokens_cached,
            cost_input: row.cost_input,
            cost_output: row.cost_output,
            cost_total: row.cost_total,
            estimated: row.estimated,
        })
    }

    /// Turns a raw row into a response, pulling and validating chunk rows
    /// when the content lives in `message_chunks`.
    async fn reassemble(&mut self, row: MessageRow) -> Result<MessageDBResponse> {
        if !row.has_chunks {
            let content = row.content.clone();
            return Ok(row.into_response(content));
        }

        let chunks = sqlx::query_as::<_, MessageChunkDBResponse>(
            "SELECT * FROM message_chunks WHERE message_id = $1 ORDER BY chunk_index",
        )
        .bind(row.id)
        .fetch_all(&mut *self.db)
        .await?;

        if chunks.is_empty() {
            return Err(DbError::Corrupt {
                detail: format!("message {} is marked chunked but has no chunks", row.id),
            });
        }

        let mut content = String::new();
        for (expected, chunk) in chunks.iter().enumerate() {
            if chunk.chunk_index != expected as i64 {
                return Err(DbError::Corrupt {
                    detail: format!(
                        "message {} chunk sequence broken: expected index {expected}, found {}",
                        row.id, chunk.chunk_index
                    ),
                });
            }
            content.push_str(&chunk.content);
        }

        Ok(row.into_response(content))
    }
}
