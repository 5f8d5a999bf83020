//! # edichat
//!
//! Session and message-history service for EDIFACT document analysis chats.
//!
//! The service sits between a chat frontend and the analysis engines. It owns
//! the boring-but-load-bearing parts: who the caller is, which chats they may
//! touch, and the durable, paginated message history (with per-message model
//! usage accounting) behind each chat.
//!
//! ## Identity
//!
//! Authentication is deliberately plain: an opaque random token per signed-in
//! device, checked against the `user_tokens` table on every request. There is
//! no signed session state, so revocation (logout, ban) is immediate. Callers
//! without an identity who perform a creating action get a *guest* account
//! minted on the fly; a later claim converts the guest in place, keeping
//! everything it created.
//!
//! ## Storage
//!
//! SQLite via SQLx, repository pattern (see [`db`]). Message bodies over a
//! size threshold are stored as ordered chunk rows and reassembled, with the
//! chunk index sequence verified, on every read.
//!
//! ## Layout
//!
//! - [`api`]: axum handlers and request/response models
//! - [`auth`]: passwords, tokens, guests, request extractors
//! - [`db`]: repositories, database models, migrations glue
//! - [`config`]: YAML + environment configuration
//! - [`errors`]: the application error type and HTTP mapping

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the edichat database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: &AppState) -> Router {
    // Authentication routes at root level
    let auth_routes = Router::new()
        .route("/authentication/register", post(api::handlers::auth::register))
        .route("/authentication/login", post(api::handlers::auth::login))
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/claim", post(api::handlers::auth::claim))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/users/me",
            get(api::handlers::users::get_me).patch(api::handlers::users::update_me),
        )
        .route(
            "/chats",
            post(api::handlers::chats::create_chat).get(api::handlers::chats::list_chats),
        )
        .route(
            "/chats/{id}",
            get(api::handlers::chats::get_chat)
                .patch(api::handlers::chats::update_chat)
                .delete(api::handlers::chats::delete_chat),
        )
        .route(
            "/chats/{id}/messages",
            get(api::handlers::chats::list_messages).post(api::handlers::chats::append_message),
        )
        .route("/chats/{id}/usage", get(api::handlers::chats::chat_usage))
        .route(
            "/provider-keys",
            post(api::handlers::provider_keys::create_provider_key)
                .get(api::handlers::provider_keys::list_provider_keys),
        )
        .route(
            "/provider-keys/{id}",
            axum::routing::delete(api::handlers::provider_keys::delete_provider_key),
        )
        .with_state(state.clone());

    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The assembled application: database, state, and router.
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting edichat with configuration: {:#?}", config);

        let pool = db::connect(&config.database).await?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&state);

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("edichat listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::api::models::chats::{ChatCreatedResponse, ChatResponse};
    use crate::api::models::messages::{MessagePageResponse, UsageSummaryResponse};
    use crate::api::models::users::{AuthResponse, UserResponse};
    use crate::test_utils::*;
    use axum_test::TestServer;
    use serde_json::json;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    async fn register(server: &TestServer, name: &str, email: &str) -> AuthResponse {
        let response = server
            .post("/authentication/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": "hunter2hunter2",
                "tos_accepted": true,
            }))
            .await;
        assert_eq!(response.status_code().as_u16(), 201);
        response.json::<AuthResponse>()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn healthz_works(pool: SqlitePool) {
        let server = create_test_app(pool);
        let response = server.get("/healthz").await;
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(response.text(), "OK");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn register_then_duplicate_conflicts(pool: SqlitePool) {
        let server = create_test_app(pool);
        let first = register(&server, "Alice", "alice@example.com").await;
        assert_eq!(first.user.name, "Alice");
        assert!(!first.user.is_guest);
        assert!(!first.token.is_empty());

        // Same email again
        let response = server
            .post("/authentication/register")
            .json(&json!({
                "name": "Alice Again",
                "email": "alice@example.com",
                "password": "hunter2hunter2",
                "tos_accepted": true,
            }))
            .await;
        assert_eq!(response.status_code().as_u16(), 409);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn register_validation_is_a_400(pool: SqlitePool) {
        let server = create_test_app(pool);

        // Missing email
        let response = server
            .post("/authentication/register")
            .json(&json!({"name": "A", "password": "hunter2hunter2", "tos_accepted": true}))
            .await;
        assert_eq!(response.status_code().as_u16(), 400);

        // Short password
        let response = server
            .post("/authentication/register")
            .json(&json!({"name": "A", "email": "a@example.com", "password": "short", "tos_accepted": true}))
            .await;
        assert_eq!(response.status_code().as_u16(), 400);

        // ToS not accepted
        let response = server
            .post("/authentication/register")
            .json(&json!({"name": "A", "email": "a@example.com", "password": "hunter2hunter2"}))
            .await;
        assert_eq!(response.status_code().as_u16(), 400);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn login_and_logout_lifecycle(pool: SqlitePool) {
        let server = create_test_app(pool);
        register(&server, "Alice", "alice@example.com").await;

        // Wrong password
        let response = server
            .post("/authentication/login")
            .json(&json!({"email": "alice@example.com", "password": "not-the-password"}))
            .await;
        assert_eq!(response.status_code().as_u16(), 401);

        // Right password
        let response = server
            .post("/authentication/login")
            .json(&json!({"email": "alice@example.com", "password": "hunter2hunter2"}))
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let auth = response.json::<AuthResponse>();

        // Authenticated profile fetch
        let response = server
            .get("/api/v1/users/me")
            .add_header("x-user-id", auth.user.id.to_string())
            .add_header("x-auth-token", auth.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        assert_eq!(response.json::<UserResponse>().name, "Alice");

        // Logout revokes exactly this token
        let response = server
            .post("/authentication/logout")
            .add_header("x-user-id", auth.user.id.to_string())
            .add_header("x-auth-token", auth.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);

        let response = server
            .get("/api/v1/users/me")
            .add_header("x-user-id", auth.user.id.to_string())
            .add_header("x-auth-token", auth.token)
            .await;
        assert_eq!(response.status_code().as_u16(), 401);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn anonymous_chat_creation_mints_a_reusable_guest(pool: SqlitePool) {
        let server = create_test_app(pool);

        let response = server.post("/api/v1/chats").json(&json!({"name": "Invoices"})).await;
        assert_eq!(response.status_code().as_u16(), 201);
        let created = response.json::<ChatCreatedResponse>();
        let guest = created.guest.expect("guest credentials in response");
        assert_eq!(created.chat.creator_id, guest.user_id);

        // The minted credentials work on the very next request
        let response = server
            .get("/api/v1/chats")
            .add_header("x-user-id", guest.user_id.to_string())
            .add_header("x-auth-token", guest.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let chats = response.json::<Vec<ChatResponse>>();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].id, created.chat.id);

        // Claiming keeps the same id and the chat with it
        let response = server
            .post("/authentication/claim")
            .add_header("x-user-id", guest.user_id.to_string())
            .add_header("x-auth-token", guest.token.clone())
            .json(&json!({
                "email": "claimed@example.com",
                "password": "hunter2hunter2",
                "tos_accepted": true,
            }))
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let auth = response.json::<AuthResponse>();
        assert_eq!(auth.user.id, guest.user_id);
        assert!(!auth.user.is_guest);

        let response = server
            .get(&format!("/api/v1/chats/{}", created.chat.id))
            .add_header("x-user-id", guest.user_id.to_string())
            .add_header("x-auth-token", guest.token)
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn other_users_chats_404_like_missing_ones(pool: SqlitePool) {
        let server = create_test_app(pool.clone());
        let alice = create_test_user(&pool, "Alice").await;
        let bob = create_test_user(&pool, "Bob").await;
        let chat = create_test_chat(&pool, &alice, "private").await;

        // Bob probing Alice's chat gets the same answer as probing a random id
        for id in [chat.id, Uuid::new_v4()] {
            let response = server
                .get(&format!("/api/v1/chats/{id}"))
                .add_header("x-user-id", bob.user.id.to_string())
                .add_header("x-auth-token", bob.token.clone())
                .await;
            assert_eq!(response.status_code().as_u16(), 404);
        }

        // Unauthenticated probing is a 401 before any lookup
        let response = server.get(&format!("/api/v1/chats/{}", chat.id)).await;
        assert_eq!(response.status_code().as_u16(), 401);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn message_pagination_over_http(pool: SqlitePool) {
        let server = create_test_app(pool.clone());
        let alice = create_test_user(&pool, "Alice").await;
        let chat = create_test_chat(&pool, &alice, "history").await;

        for i in 1..=15 {
            let response = server
                .post(&format!("/api/v1/chats/{}/messages", chat.id))
                .add_header("x-user-id", alice.user.id.to_string())
                .add_header("x-auth-token", alice.token.clone())
                .json(&json!({"role": "user", "content": format!("m{i}")}))
                .await;
            assert_eq!(response.status_code().as_u16(), 201);
        }

        let response = server
            .get(&format!("/api/v1/chats/{}/messages?page=2&limit=10", chat.id))
            .add_header("x-user-id", alice.user.id.to_string())
            .add_header("x-auth-token", alice.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let page = response.json::<MessagePageResponse>();
        assert_eq!(page.session_id, chat.id);
        assert_eq!(page.total, 15);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 10);
        assert!(!page.has_more);
        let bodies: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, vec!["m11", "m12", "m13", "m14", "m15"]);

        // Nonsense paging parameters are corrected, not rejected
        let response = server
            .get(&format!("/api/v1/chats/{}/messages?page=0&limit=-1", chat.id))
            .add_header("x-user-id", alice.user.id.to_string())
            .add_header("x-auth-token", alice.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let page = response.json::<MessagePageResponse>();
        assert_eq!(page.page, 1);
        assert_eq!(page.messages.len(), 15);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn usage_endpoint_aggregates_messages(pool: SqlitePool) {
        let server = create_test_app(pool.clone());
        let alice = create_test_user(&pool, "Alice").await;
        let chat = create_test_chat(&pool, &alice, "usage").await;

        let response = server
            .post(&format!("/api/v1/chats/{}/messages", chat.id))
            .add_header("x-user-id", alice.user.id.to_string())
            .add_header("x-auth-token", alice.token.clone())
            .json(&json!({
                "role": "assistant",
                "content": "answer",
                "usage": {
                    "provider": "anthropic",
                    "model": "claude-sonnet",
                    "tokens": {"input": 120, "output": 80, "total": 200, "cached": 0},
                    "cost": {"input": 0.12, "output": 0.24, "total": 0.36},
                    "latency_ms": 900,
                    "estimated": false
                }
            }))
            .await;
        assert_eq!(response.status_code().as_u16(), 201);

        let response = server
            .get(&format!("/api/v1/chats/{}/usage", chat.id))
            .add_header("x-user-id", alice.user.id.to_string())
            .add_header("x-auth-token", alice.token.clone())
            .await;
        assert_eq!(response.status_code().as_u16(), 200);
        let summary = response.json::<UsageSummaryResponse>();
        assert_eq!(summary.tokens.input, 120);
        assert_eq!(summary.tokens.output, 80);
        assert_eq!(summary.tokens.total, 200);
        assert!(!summary.estimated);
    }
}
