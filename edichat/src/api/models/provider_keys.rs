//! API models for stored model-provider credentials.

use crate::db::models::provider_keys::ProviderKeyDBResponse;
use crate::types::{ProviderKeyId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported upstream model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Openai,
    Anthropic,
    Google,
    Mistral,
    Ollama,
    Custom,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Mistral => "mistral",
            Provider::Ollama => "ollama",
            Provider::Custom => "custom",
        };
        write!(f, "{s}")
    }
}

/// Request body for registering a provider credential.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderKeyCreate {
    pub provider: Provider,
    pub secret: String,
    /// Override endpoint, mainly for `ollama` and `custom`
    pub base_url: Option<String>,
}

/// A stored provider credential. The secret is never echoed back in full.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderKeyResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ProviderKeyId,
    #[schema(value_type = String, format = "uuid")]
    pub owner_id: UserId,
    pub provider: Provider,
    /// Last four characters of the stored secret
    pub secret_hint: String,
    pub base_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response for key creation; carries guest credentials when the caller had
/// no identity and one was minted for this request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderKeyCreatedResponse {
    #[serde(flatten)]
    pub key: ProviderKeyResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest: Option<crate::api::models::chats::GuestCredentials>,
}

impl From<ProviderKeyDBResponse> for ProviderKeyResponse {
    fn from(db: ProviderKeyDBResponse) -> Self {
        let hint = db
            .secret
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Self {
            id: db.id,
            owner_id: db.owner_id,
            provider: db.provider,
            secret_hint: hint,
            base_url: db.base_url,
            created_at: db.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn secret_hint_keeps_only_the_tail() {
        let db = ProviderKeyDBResponse {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            provider: Provider::Openai,
            secret: "sk-abcdef123456".into(),
            base_url: None,
            created_at: Utc::now(),
        };
        let api = ProviderKeyResponse::from(db);
        assert_eq!(api.secret_hint, "3456");
    }

    #[test]
    fn secret_hint_handles_short_secrets() {
        let db = ProviderKeyDBResponse {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            provider: Provider::Custom,
            secret: "ab".into(),
            base_url: Some("http://localhost:11434".into()),
            created_at: Utc::now(),
        };
        assert_eq!(ProviderKeyResponse::from(db).secret_hint, "ab");
    }
}
