//! OpenAPI documentation for the HTTP surface, served with a Scalar UI at
//! `/docs`.

use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::models::{
    chats::{ChatCreate, ChatCreatedResponse, ChatResponse, ChatUpdate, GuestCredentials},
    messages::{
        CostBreakdown, MessageCreate, MessagePageResponse, MessageResponse, MessageRole,
        TokenUsage, UsageInfo, UsageSummaryResponse,
    },
    provider_keys::{Provider, ProviderKeyCreate, ProviderKeyCreatedResponse, ProviderKeyResponse},
    users::{
        AuthResponse, ClaimRequest, CurrentUser, LoginRequest, RegisterRequest, SuccessResponse,
        UserResponse, UserUpdate,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::claim,
        handlers::users::get_me,
        handlers::users::update_me,
        handlers::chats::create_chat,
        handlers::chats::list_chats,
        handlers::chats::get_chat,
        handlers::chats::update_chat,
        handlers::chats::delete_chat,
        handlers::chats::list_messages,
        handlers::chats::append_message,
        handlers::chats::chat_usage,
        handlers::provider_keys::create_provider_key,
        handlers::provider_keys::list_provider_keys,
        handlers::provider_keys::delete_provider_key,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        ClaimRequest,
        UserUpdate,
        UserResponse,
        AuthResponse,
        CurrentUser,
        SuccessResponse,
        ChatCreate,
        ChatUpdate,
        ChatResponse,
        ChatCreatedResponse,
        GuestCredentials,
        MessageRole,
        TokenUsage,
        CostBreakdown,
        UsageInfo,
        MessageCreate,
        MessageResponse,
        MessagePageResponse,
        UsageSummaryResponse,
        Provider,
        ProviderKeyCreate,
        ProviderKeyResponse,
        ProviderKeyCreatedResponse,
    )),
    tags(
        (name = "authentication", description = "Registration, login, and guest claims"),
        (name = "users", description = "Current-user profile"),
        (name = "chats", description = "Analysis chats and their message history"),
        (name = "provider-keys", description = "Stored model-provider credentials"),
    ),
    info(
        title = "edichat API",
        description = "Session and message-history service for EDIFACT document analysis chats",
    )
)]
pub struct ApiDoc;
