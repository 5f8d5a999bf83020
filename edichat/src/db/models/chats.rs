//! Database models for analysis chats.

use crate::types::{ChatId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new chat
#[derive(Debug, Clone)]
pub struct ChatCreateDBRequest {
    pub creator_id: UserId,
    pub name: String,
}

/// Database request for updating a chat. Ownership never changes.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdateDBRequest {
    pub name: Option<String>,
}

/// Database response for a chat
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChatDBResponse {
    pub id: ChatId,
    pub creator_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
