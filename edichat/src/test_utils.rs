//! Test utilities for integration testing.

use crate::auth::token::issue_token;
use crate::config::{AuthConfig, Config, DatabaseConfig, PasswordConfig, SessionConfig};
use crate::db::handlers::{Chats, Repository, Users};
use crate::db::models::chats::{ChatCreateDBRequest, ChatDBResponse};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::{AppState, build_router};
use axum_test::TestServer;
use sqlx::SqlitePool;

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        auth: AuthConfig {
            session: SessionConfig::default(),
            // Fast argon2-free policy checks stay the same; only lengths matter here
            password: PasswordConfig {
                min_length: 8,
                max_length: 128,
            },
        },
    }
}

/// Router-backed test server running against the given pool.
pub fn create_test_app(pool: SqlitePool) -> TestServer {
    let state = AppState::builder().db(pool).config(create_test_config()).build();
    TestServer::new(build_router(&state).into_make_service()).expect("Failed to create test server")
}

/// A registered (non-guest) user with one signed-in device.
pub struct TestUser {
    pub user: UserDBResponse,
    pub token: String,
}

/// Creates a registered user directly in the database, bypassing the HTTP
/// registration flow (no argon2 cost in tests that don't exercise login).
pub async fn create_test_user(pool: &SqlitePool, name: &str) -> TestUser {
    let mut conn = pool.acquire().await.expect("acquire connection");
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            password_hash: Some("unused-hash".to_string()),
            is_guest: false,
            tos_accepted: true,
            theme: None,
        })
        .await
        .expect("create test user");

    let issued = issue_token(&mut conn, user.id, Some("test".to_string()))
        .await
        .expect("issue token");

    TestUser {
        user,
        token: issued.token,
    }
}

pub async fn create_test_chat(pool: &SqlitePool, creator: &TestUser, name: &str) -> ChatDBResponse {
    let mut conn = pool.acquire().await.expect("acquire connection");
    Chats::new(&mut conn)
        .create(&ChatCreateDBRequest {
            creator_id: creator.user.id,
            name: name.to_string(),
        })
        .await
        .expect("create test chat")
}
