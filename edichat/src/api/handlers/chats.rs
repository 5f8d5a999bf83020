use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        chats::{ChatCreate, ChatCreatedResponse, ChatResponse, ChatUpdate, GuestCredentials},
        messages::{MessageCreate, MessagePageResponse, MessageResponse, UsageSummaryResponse},
        pagination::MessagesQuery,
        users::CurrentUser,
    },
    auth::{AuthSession, MaybeSession, guest},
    db::{
        handlers::{Chats, Messages, Repository},
        models::{
            chats::{ChatCreateDBRequest, ChatDBResponse, ChatUpdateDBRequest},
            messages::MessageCreateDBRequest,
        },
    },
    errors::Error,
    types::ChatId,
};

/// Name given to chats created without one.
const DEFAULT_CHAT_NAME: &str = "New chat";

/// Resolves a chat for a caller, conflating "missing" and "not yours" into
/// the same 404.
async fn authorize_chat(
    conn: &mut sqlx::SqliteConnection,
    chat_id: ChatId,
    user: &CurrentUser,
) -> Result<ChatDBResponse, Error> {
    Chats::new(conn)
        .get_owned(chat_id, user.id)
        .await?
        .ok_or(Error::NotFound {
            resource: "chat".to_string(),
            id: chat_id.to_string(),
        })
}

/// Create a new chat
///
/// Callers without an identity get a guest account minted for the request;
/// its credentials ride along in the response.
#[utoipa::path(
    post,
    path = "/api/v1/chats",
    request_body = ChatCreate,
    tag = "chats",
    responses(
        (status = 201, description = "Chat created", body = ChatCreatedResponse),
        (status = 401, description = "Credentials present but invalid"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_chat(
    State(state): State<AppState>,
    session: MaybeSession,
    Json(request): Json<ChatCreate>,
) -> Result<(StatusCode, Json<ChatCreatedResponse>), Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let (creator_id, guest_credentials) = match session.0 {
        Some(session) => (session.user.id, None),
        None => {
            let (user, issued) = guest::create_guest(&mut conn, None).await?;
            let credentials = GuestCredentials {
                user_id: user.id,
                name: user.name,
                token: issued.token,
            };
            (user.id, Some(credentials))
        }
    };

    let chat = Chats::new(&mut conn)
        .create(&ChatCreateDBRequest {
            creator_id,
            name: request.name.unwrap_or_else(|| DEFAULT_CHAT_NAME.to_string()),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ChatCreatedResponse {
            chat: ChatResponse::from(chat),
            guest: guest_credentials,
        }),
    ))
}

/// List the caller's chats
#[utoipa::path(
    get,
    path = "/api/v1/chats",
    tag = "chats",
    responses(
        (status = 200, description = "The caller's chats", body = [ChatResponse]),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_chats(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<ChatResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let chats = Chats::new(&mut conn)
        .list(&crate::db::handlers::chats::ChatFilter::for_user(user.id))
        .await?;
    Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
}

/// Get a single chat
#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "The chat", body = ChatResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<ChatResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let chat = authorize_chat(&mut conn, chat_id, &user).await?;
    Ok(Json(ChatResponse::from(chat)))
}

/// Rename a chat
#[utoipa::path(
    patch,
    path = "/api/v1/chats/{id}",
    request_body = ChatUpdate,
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Updated chat", body = ChatResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<ChatId>,
    Json(request): Json<ChatUpdate>,
) -> Result<Json<ChatResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    authorize_chat(&mut conn, chat_id, &user).await?;

    let chat = Chats::new(&mut conn)
        .update(chat_id, &ChatUpdateDBRequest { name: request.name })
        .await?;
    Ok(Json(ChatResponse::from(chat)))
}

/// Delete a chat and its history
#[utoipa::path(
    delete,
    path = "/api/v1/chats/{id}",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 204, description = "Chat deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<ChatId>,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    authorize_chat(&mut conn, chat_id, &user).await?;

    // Messages and chunks go with it via cascade
    Chats::new(&mut conn).delete(chat_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a chat's messages, paginated
#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}/messages",
    tag = "chats",
    params(
        ("id" = String, Path, description = "Chat id"),
        MessagesQuery,
    ),
    responses(
        (status = 200, description = "One page of history", body = MessagePageResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<ChatId>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagePageResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    authorize_chat(&mut conn, chat_id, &user).await?;

    let (page, page_size) = query.normalized();
    let db_page = Messages::new(&mut conn).load_page(chat_id, page, page_size).await?;
    Ok(Json(MessagePageResponse::new(chat_id, db_page)))
}

/// Append a message to a chat
#[utoipa::path(
    post,
    path = "/api/v1/chats/{id}/messages",
    request_body = MessageCreate,
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 201, description = "Message appended", body = MessageResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn append_message(
    State(state): State<AppState>,
    session: AuthSession,
    Path(chat_id): Path<ChatId>,
    Json(request): Json<MessageCreate>,
) -> Result<(StatusCode, Json<MessageResponse>), Error> {
    if request.content.is_empty() {
        return Err(Error::BadRequest {
            message: "Message content must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    authorize_chat(&mut conn, chat_id, &session.user).await?;

    let message = Messages::new(&mut conn)
        .append(&MessageCreateDBRequest {
            chat_id,
            role: request.role,
            content: request.content,
            file_ids: request.file_ids,
            tool_calls: request.tool_calls,
            tool_results: request.tool_results,
            usage: request.usage,
            metadata: request.metadata,
        })
        .await?;

    Chats::new(&mut conn).touch(chat_id).await?;

    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// Get a chat's aggregated usage
#[utoipa::path(
    get,
    path = "/api/v1/chats/{id}/usage",
    tag = "chats",
    params(("id" = String, Path, description = "Chat id")),
    responses(
        (status = 200, description = "Usage rollup", body = UsageSummaryResponse),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Chat not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn chat_usage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(chat_id): Path<ChatId>,
) -> Result<Json<UsageSummaryResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    authorize_chat(&mut conn, chat_id, &user).await?;

    let summary = Messages::new(&mut conn).usage_summary(chat_id).await?;
    Ok(Json(UsageSummaryResponse::from(summary)))
}
