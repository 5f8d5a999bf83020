use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    api::models::users::{
        AuthResponse, ClaimRequest, LoginRequest, RegisterRequest, SuccessResponse, UserResponse,
    },
    auth::{AuthSession, password, token},
    config::Config,
    db::{
        handlers::{Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
};

/// Cookie mirroring the issued token so browser clients can re-present it.
fn session_cookie(token: &str, config: &Config) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.auth.session.cookie_name, token, config.auth.session.cookie_max_age_secs
    )
}

fn cleared_session_cookie(config: &Config) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.auth.session.cookie_name
    )
}

fn check_password_policy(password: &str, config: &Config) -> Result<(), Error> {
    let policy = &config.auth.password;
    if password.len() < policy.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", policy.min_length),
        });
    }
    if password.len() > policy.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", policy.max_length),
        });
    }
    Ok(())
}

/// A request field that must be present and non-empty.
fn require_field(value: Option<String>, name: &str) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::BadRequest {
            message: format!("Missing required field: {name}"),
        }),
    }
}

async fn hash_on_blocking_thread(password: String) -> Result<String, Error> {
    // Hash on a blocking thread to avoid stalling the async runtime
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Name or email already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, Error> {
    let name = require_field(request.name, "name")?;
    let email = require_field(request.email, "email")?;
    let password = require_field(request.password, "password")?;
    check_password_policy(&password, &state.config)?;
    if !request.tos_accepted {
        return Err(Error::BadRequest {
            message: "Terms of service must be accepted".to_string(),
        });
    }

    let password_hash = hash_on_blocking_thread(password).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    // Duplicate name/email surfaces as a unique violation, mapped to 409
    let user = Users::new(&mut conn)
        .create(&UserCreateDBRequest {
            name,
            email: Some(email),
            password_hash: Some(password_hash),
            is_guest: false,
            tos_accepted: true,
            theme: None,
        })
        .await?;

    let issued = token::issue_token(&mut conn, user.id, request.device).await?;
    let cookie = session_cookie(&issued.token, &state.config);

    let body = AuthResponse {
        user: UserResponse::from(user),
        token: issued.token,
    };
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, Error> {
    let email = require_field(request.email, "email")?;
    let password = require_field(request.password, "password")?;

    let invalid = || Error::Unauthenticated {
        message: Some("Invalid email or password".to_string()),
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_email(&email).await?.ok_or_else(invalid)?;

    // Guests have no password; they claim instead of logging in
    let hash = user.password_hash.clone().ok_or_else(invalid)?;

    // Verify on a blocking thread to avoid stalling the async runtime
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;
    if !is_valid {
        return Err(invalid());
    }

    let issued = token::issue_token(&mut conn, user.id, request.device).await?;
    let cookie = session_cookie(&issued.token, &state.config);

    let body = AuthResponse {
        user: UserResponse::from(user),
        token: issued.token,
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Logout (revoke the presented token)
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 200, description = "Logout successful", body = SuccessResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: AuthSession) -> Result<Response, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    // Only this device's token dies; other devices stay signed in
    token::revoke_token(&mut conn, &session.token).await?;

    let cookie = cleared_session_cookie(&state.config);
    let body = SuccessResponse {
        message: "Logout successful".to_string(),
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Claim a guest account, converting it into a registered one in place
#[utoipa::path(
    post,
    path = "/authentication/claim",
    request_body = ClaimRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Account claimed", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 409, description = "Not a guest, or email already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn claim(
    State(state): State<AppState>,
    session: AuthSession,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<AuthResponse>, Error> {
    if !session.user.is_guest {
        return Err(Error::Conflict {
            message: "Account is already registered".to_string(),
        });
    }

    let email = require_field(request.email, "email")?;
    let password = require_field(request.password, "password")?;
    check_password_policy(&password, &state.config)?;
    if !request.tos_accepted {
        return Err(Error::BadRequest {
            message: "Terms of service must be accepted".to_string(),
        });
    }

    let password_hash = hash_on_blocking_thread(password).await?;

    // Promotion is a field update on the guest's own row. The id does not
    // change, so chats and keys created as a guest stay owned.
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn)
        .update(
            session.user.id,
            &UserUpdateDBRequest {
                name: request.name,
                email: Some(email),
                password_hash: Some(password_hash),
                is_guest: Some(false),
                tos_accepted: Some(true),
                ..Default::default()
            },
        )
        .await?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        token: session.token,
    }))
}
