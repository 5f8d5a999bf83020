//! Database repository for provider credentials.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::provider_keys::{
        ProviderKeyCreateDBRequest, ProviderKeyDBResponse, ProviderKeyUpdateDBRequest,
    },
};
use crate::types::{ProviderKeyId, UserId, abbrev_uuid};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing provider keys
#[derive(Debug, Clone)]
pub struct ProviderKeyFilter {
    pub owner_id: UserId,
}

pub struct ProviderKeys<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> ProviderKeys<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Fetches a key only if it belongs to `owner_id`; absent and not-owned
    /// look the same to the caller.
    #[instrument(skip(self), fields(key_id = %abbrev_uuid(&id), owner_id = %abbrev_uuid(&owner_id)), err)]
    pub async fn get_owned(&mut self, id: ProviderKeyId, owner_id: UserId) -> Result<Option<ProviderKeyDBResponse>> {
        let key = sqlx::query_as::<_, ProviderKeyDBResponse>(
            "SELECT * FROM provider_keys WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(key)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for ProviderKeys<'c> {
    type CreateRequest = ProviderKeyCreateDBRequest;
    type UpdateRequest = ProviderKeyUpdateDBRequest;
    type Response = ProviderKeyDBResponse;
    type Id = ProviderKeyId;
    type Filter = ProviderKeyFilter;

    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id), provider = %request.provider), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let key = sqlx::query_as::<_, ProviderKeyDBResponse>(
            r#"
            INSERT INTO provider_keys (id, owner_id, provider, secret, base_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.owner_id)
        .bind(request.provider)
        .bind(&request.secret)
        .bind(&request.base_url)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(key)
    }

    #[instrument(skip(self), fields(key_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let key = sqlx::query_as::<_, ProviderKeyDBResponse>("SELECT * FROM provider_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(key)
    }

    #[instrument(skip(self, filter), fields(owner_id = %abbrev_uuid(&filter.owner_id)), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let keys = sqlx::query_as::<_, ProviderKeyDBResponse>(
            "SELECT * FROM provider_keys WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(filter.owner_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(keys)
    }

    #[instrument(skip(self), fields(key_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM provider_keys WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(key_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // base_url distinguishes "leave alone" (outer None) from "clear"
        // (inner None), so it cannot go through COALESCE.
        let current = sqlx::query_as::<_, ProviderKeyDBResponse>("SELECT * FROM provider_keys WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        let base_url = match &request.base_url {
            Some(new_value) => new_value.clone(),
            None => current.base_url,
        };

        let key = sqlx::query_as::<_, ProviderKeyDBResponse>(
            r#"
            UPDATE provider_keys SET
                secret = COALESCE($2, secret),
                base_url = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.secret)
        .bind(base_url)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(key)
    }
}
