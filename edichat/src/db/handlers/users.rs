//! Database repository for users and their device tokens.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserTokenDBResponse, UserUpdateDBRequest},
};
use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self), fields(name = %name), err)]
    pub async fn get_by_name(&mut self, name: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    /// Records a device token for a user. One user may hold many tokens, one
    /// per signed-in device.
    #[instrument(skip(self, token), fields(user_id = %abbrev_uuid(&user_id), device = %device), err)]
    pub async fn add_token(&mut self, user_id: UserId, token: &str, device: &str) -> Result<UserTokenDBResponse> {
        let row = sqlx::query_as::<_, UserTokenDBResponse>(
            r#"
            INSERT INTO user_tokens (token, user_id, device, issued_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(device)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;
        Ok(row)
    }

    /// Deletes a single device token. Returns false if the token was not
    /// present, which callers treat as already-revoked.
    #[instrument(skip(self, token), err)]
    pub async fn remove_token(&mut self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_tokens WHERE token = $1")
            .bind(token)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolves a `(user_id, token)` presentation against current state.
    ///
    /// This is a fresh read on every call: a token removed by logout or by an
    /// administrator stops resolving immediately, with no grace period. The
    /// token must belong to the named user; a valid token presented with a
    /// different user id does not resolve.
    #[instrument(skip(self, token), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn resolve_token(&mut self, user_id: UserId, token: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            SELECT u.* FROM users u
            JOIN user_tokens t ON t.user_id = u.id
            WHERE t.token = $1 AND u.id = $2
            "#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;
        Ok(user)
    }

    /// All active device tokens for a user, oldest first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_tokens(&mut self, user_id: UserId) -> Result<Vec<UserTokenDBResponse>> {
        let rows = sqlx::query_as::<_, UserTokenDBResponse>(
            "SELECT * FROM user_tokens WHERE user_id = $1 ORDER BY issued_at, token",
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (id, name, email, password_hash, is_guest, tos_accepted, theme, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.is_guest)
        .bind(request.tos_accepted)
        .bind(&request.theme)
        .bind(now)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(users)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                is_guest = COALESCE($5, is_guest),
                tos_accepted = COALESCE($6, tos_accepted),
                theme = COALESCE($7, theme),
                banned = COALESCE($8, banned),
                updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.is_guest)
        .bind(request.tos_accepted)
        .bind(&request.theme)
        .bind(request.banned)
        .bind(Utc::now())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn seed_user(conn: &mut SqliteConnection, name: &str, email: &str) -> UserDBResponse {
        Users::new(conn)
            .create(&UserCreateDBRequest {
                name: name.to_string(),
                email: Some(email.to_string()),
                password_hash: Some("hash".to_string()),
                is_guest: false,
                tos_accepted: true,
                theme: None,
            })
            .await
            .expect("create user")
    }

    #[sqlx::test]
    async fn create_and_fetch_roundtrip(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let created = seed_user(&mut conn, "Alice", "alice@example.com").await;

        let fetched = Users::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Alice");
        assert_eq!(fetched.email.as_deref(), Some("alice@example.com"));
        assert!(!fetched.is_guest);
        assert!(!fetched.banned);
    }

    #[sqlx::test]
    async fn duplicate_email_is_a_unique_violation(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        seed_user(&mut conn, "Alice", "alice@example.com").await;

        let err = Users::new(&mut conn)
            .create(&UserCreateDBRequest {
                name: "Other".to_string(),
                email: Some("alice@example.com".to_string()),
                password_hash: Some("hash".to_string()),
                is_guest: false,
                tos_accepted: true,
                theme: None,
            })
            .await
            .unwrap_err();

        match err {
            crate::db::errors::DbError::UniqueViolation { table, column, .. } => {
                assert_eq!(table.as_deref(), Some("users"));
                assert_eq!(column.as_deref(), Some("email"));
            }
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[sqlx::test]
    async fn guest_promotion_updates_in_place(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let guest = Users::new(&mut conn)
            .create(&UserCreateDBRequest::guest("Brisk Segment 0042".to_string()))
            .await
            .unwrap();
        assert!(guest.is_guest);
        assert!(guest.email.is_none());

        let promoted = Users::new(&mut conn)
            .update(
                guest.id,
                &UserUpdateDBRequest {
                    email: Some("claimed@example.com".to_string()),
                    password_hash: Some("hash".to_string()),
                    is_guest: Some(false),
                    tos_accepted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(promoted.id, guest.id);
        assert!(!promoted.is_guest);
        assert_eq!(promoted.email.as_deref(), Some("claimed@example.com"));
    }

    #[sqlx::test]
    async fn token_lifecycle(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = seed_user(&mut conn, "Alice", "alice@example.com").await;

        let mut users = Users::new(&mut conn);
        users.add_token(user.id, "tok-laptop", "laptop").await.unwrap();
        users.add_token(user.id, "tok-phone", "phone").await.unwrap();

        // Both devices resolve independently
        assert!(users.resolve_token(user.id, "tok-laptop").await.unwrap().is_some());
        assert!(users.resolve_token(user.id, "tok-phone").await.unwrap().is_some());

        // Revoking one leaves the other intact
        assert!(users.remove_token("tok-laptop").await.unwrap());
        assert!(users.resolve_token(user.id, "tok-laptop").await.unwrap().is_none());
        assert!(users.resolve_token(user.id, "tok-phone").await.unwrap().is_some());

        // Removing an unknown token is not an error
        assert!(!users.remove_token("tok-laptop").await.unwrap());
    }

    #[sqlx::test]
    async fn token_is_bound_to_its_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = seed_user(&mut conn, "Alice", "alice@example.com").await;
        let bob = seed_user(&mut conn, "Bob", "bob@example.com").await;

        let mut users = Users::new(&mut conn);
        users.add_token(alice.id, "tok-alice", "laptop").await.unwrap();

        // Bob cannot present Alice's token
        assert!(users.resolve_token(bob.id, "tok-alice").await.unwrap().is_none());
    }

    #[sqlx::test]
    async fn deleting_a_user_cascades_to_tokens(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = seed_user(&mut conn, "Alice", "alice@example.com").await;

        let mut users = Users::new(&mut conn);
        users.add_token(user.id, "tok", "laptop").await.unwrap();
        assert!(users.delete(user.id).await.unwrap());
        assert!(users.list_tokens(user.id).await.unwrap().is_empty());
    }
}
