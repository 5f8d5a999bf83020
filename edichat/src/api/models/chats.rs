//! API request/response models for chats.

use crate::db::models::chats::ChatDBResponse;
use crate::types::{ChatId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatCreate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ChatId,
    #[schema(value_type = String, format = "uuid")]
    pub creator_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatDBResponse> for ChatResponse {
    fn from(db: ChatDBResponse) -> Self {
        Self {
            id: db.id,
            creator_id: db.creator_id,
            name: db.name,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Response for chat creation. When the caller had no account a guest
/// identity is minted on the fly and its credentials ride along here.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatCreatedResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    /// Present only when a guest identity was created for this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestCredentials>,
}

/// Credentials for a freshly minted guest identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GuestCredentials {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub token: String,
}
