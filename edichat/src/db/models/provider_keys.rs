//! Database models for AI provider credentials.

use crate::api::models::provider_keys::{Provider, ProviderKeyCreate};
use crate::types::{ProviderKeyId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new provider key
#[derive(Debug, Clone)]
pub struct ProviderKeyCreateDBRequest {
    pub owner_id: UserId,
    pub provider: Provider,
    pub secret: String,
    pub base_url: Option<String>,
}

impl ProviderKeyCreateDBRequest {
    pub fn new(owner_id: UserId, create: ProviderKeyCreate) -> Self {
        Self {
            owner_id,
            provider: create.provider,
            secret: create.secret,
            base_url: create.base_url,
        }
    }
}

/// Database request for updating a provider key
#[derive(Debug, Clone, Default)]
pub struct ProviderKeyUpdateDBRequest {
    pub secret: Option<String>,
    pub base_url: Option<Option<String>>,
}

/// Database response for a provider key.
///
/// `secret` is stored and returned in plaintext; encryption at rest is a
/// known gap.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProviderKeyDBResponse {
    pub id: ProviderKeyId,
    pub owner_id: UserId,
    pub provider: Provider,
    pub secret: String,
    pub base_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
