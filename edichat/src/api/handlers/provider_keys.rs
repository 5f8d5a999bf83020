use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::models::{
        chats::GuestCredentials,
        provider_keys::{ProviderKeyCreate, ProviderKeyCreatedResponse, ProviderKeyResponse},
        users::CurrentUser,
    },
    auth::{MaybeSession, guest},
    db::{
        handlers::{ProviderKeys, Repository, provider_keys::ProviderKeyFilter},
        models::provider_keys::ProviderKeyCreateDBRequest,
    },
    errors::Error,
    types::ProviderKeyId,
};

/// Register a provider credential
///
/// The canonical guest-promotion trigger: a caller with no identity who
/// stores a key gets a guest account minted for the request.
#[utoipa::path(
    post,
    path = "/api/v1/provider-keys",
    request_body = ProviderKeyCreate,
    tag = "provider-keys",
    responses(
        (status = 201, description = "Key stored", body = ProviderKeyCreatedResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Credentials present but invalid"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_provider_key(
    State(state): State<AppState>,
    session: MaybeSession,
    Json(request): Json<ProviderKeyCreate>,
) -> Result<(StatusCode, Json<ProviderKeyCreatedResponse>), Error> {
    if request.secret.trim().is_empty() {
        return Err(Error::BadRequest {
            message: "Provider key secret must not be empty".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    let (owner_id, guest_credentials) = match session.0 {
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

    let key = ProviderKeys::new(&mut conn)
        .create(&ProviderKeyCreateDBRequest::new(owner_id, request))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProviderKeyCreatedResponse {
            key: ProviderKeyResponse::from(key),
            guest: guest_credentials,
        }),
    ))
}

/// List the caller's provider keys
#[utoipa::path(
    get,
    path = "/api/v1/provider-keys",
    tag = "provider-keys",
    responses(
        (status = 200, description = "The caller's keys", body = [ProviderKeyResponse]),
        (status = 401, description = "Not authenticated"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn list_provider_keys(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ProviderKeyResponse>>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let keys = ProviderKeys::new(&mut conn)
        .list(&ProviderKeyFilter { owner_id: user.id })
        .await?;
    Ok(Json(keys.into_iter().map(ProviderKeyResponse::from).collect()))
}

/// Delete a provider key
#[utoipa::path(
    delete,
    path = "/api/v1/provider-keys/{id}",
    tag = "provider-keys",
    params(("id" = String, Path, description = "Key id")),
    responses(
        (status = 204, description = "Key deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Key not found"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_provider_key(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(key_id): Path<ProviderKeyId>,
) -> Result<StatusCode, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    // Absent and not-owned answer identically
    let key = ProviderKeys::new(&mut conn)
        .get_owned(key_id, user.id)
        .await?
        .ok_or(Error::NotFound {
            resource: "provider key".to_string(),
            id: key_id.to_string(),
        })?;

    ProviderKeys::new(&mut conn).delete(key.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
