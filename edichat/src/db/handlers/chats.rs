//! Database repository for chats.

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::chats::{ChatCreateDBRequest, ChatDBResponse, ChatUpdateDBRequest},
};
use crate::types::{ChatId, UserId, abbrev_uuid};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing chats
#[derive(Debug, Clone)]
pub struct ChatFilter {
    /// Restrict to chats created by this user
    pub creator_id: Option<UserId>,
    pub skip: i64,
    pub limit: i64,
}

impl ChatFilter {
    pub fn for_user(creator_id: UserId) -> Self {
        Self {
            creator_id: Some(creator_id),
            skip: 0,
            limit: 1000,
        }
    }
}

pub struct Chats<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Chats<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Fetches a chat only if it exists AND belongs to `user_id`.
    ///
    /// The two failure cases are indistinguishable to the caller on purpose:
    /// a user probing ids must not learn whether somebody else's chat exists.
    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&chat_id), user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_owned(&mut self, chat_id: ChatId, user_id: UserId) -> Result<Option<ChatDBResponse>> {
        let chat = sqlx::query_as::<_, ChatDBResponse>(
            "SELECT * FROM chats WHERE id = $1 AND creator_id = $2",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(chat)
    }

    /// Bumps `updated_at`, called when a message lands in the chat.
    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&chat_id)), err)]
    pub async fn touch(&mut self, chat_id: ChatId) -> Result<()> {
        sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(Utc::now())
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Chats<'c> {
    type CreateRequest = ChatCreateDBRequest;
    type UpdateRequest = ChatUpdateDBRequest;
    type Response = ChatDBResponse;
    type Id = ChatId;
    type Filter = ChatFilter;

    #[instrument(skip(self, request), fields(creator_id = %abbrev_uuid(&request.creator_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let chat_id = Uuid::new_v4();
        let now = Utc::now();

        let chat = sqlx::query_as::<_, ChatDBResponse>(
            r#"
            INSERT INTO chats (id, creator_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(chat_id)
        .bind(request.creator_id)
        .bind(&request.name)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(chat)
    }

    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let chat = sqlx::query_as::<_, ChatDBResponse>("SELECT * FROM chats WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(chat)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let chats = match filter.creator_id {
            Some(creator_id) => {
                sqlx::query_as::<_, ChatDBResponse>(
                    "SELECT * FROM chats WHERE creator_id = $1 ORDER BY updated_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(creator_id)
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, ChatDBResponse>(
                    "SELECT * FROM chats ORDER BY updated_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(filter.limit)
                .bind(filter.skip)
                .fetch_all(&mut *self.db)
                .await?
            }
        };
        Ok(chats)
    }

    #[instrument(skip(self), fields(chat_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(chat_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let chat = sqlx::query_as::<_, ChatDBResponse>(
            r#"
            UPDATE chats SET
                name = COALESCE($2, name),
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::users::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::SqlitePool;

    async fn seed_user(conn: &mut SqliteConnection, name: &str) -> UserId {
        Users::new(conn)
            .create(&UserCreateDBRequest::guest(name.to_string()))
            .await
            .expect("create user")
            .id
    }

    #[sqlx::test]
    async fn get_owned_hides_other_users_chats(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = seed_user(&mut conn, "Alice").await;
        let bob = seed_user(&mut conn, "Bob").await;

        let chat = Chats::new(&mut conn)
            .create(&ChatCreateDBRequest {
                creator_id: alice,
                name: "Invoice review".to_string(),
            })
            .await
            .unwrap();

        let mut chats = Chats::new(&mut conn);
        assert!(chats.get_owned(chat.id, alice).await.unwrap().is_some());
        // Same shape of answer as a chat that does not exist at all
        assert!(chats.get_owned(chat.id, bob).await.unwrap().is_none());
        assert!(chats.get_owned(Uuid::new_v4(), alice).await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn list_is_scoped_to_creator(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = seed_user(&mut conn, "Alice").await;
        let bob = seed_user(&mut conn, "Bob").await;

        let mut chats = Chats::new(&mut conn);
        for name in ["a", "b"] {
            chats
                .create(&ChatCreateDBRequest {
                    creator_id: alice,
                    name: name.to_string(),
                })
                .await
                .unwrap();
        }
        chats
            .create(&ChatCreateDBRequest {
                creator_id: bob,
                name: "c".to_string(),
            })
            .await
            .unwrap();

        let listed = chats.list(&ChatFilter::for_user(alice)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.creator_id == alice));
    }
}
