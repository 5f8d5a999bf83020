use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::token::verify_token,
    db::errors::DbError,
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};
use uuid::Uuid;

/// Header carrying the caller's user id, as issued at register/login time.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the opaque session token paired with the user id.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// An authenticated request context: the resolved user plus the exact token
/// it presented. Handlers that revoke (logout) need the token itself.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: CurrentUser,
    pub token: String,
}

/// Raw credentials lifted off the request headers, before any lookup.
fn read_credentials(parts: &Parts) -> Result<Option<(Uuid, String)>> {
    let user_id = parts.headers.get(USER_ID_HEADER);
    let token = parts.headers.get(AUTH_TOKEN_HEADER);

    let (user_id, token) = match (user_id, token) {
        (None, None) => return Ok(None),
        // One header without the other is a malformed presentation, not an
        // anonymous request
        (Some(_), None) | (None, Some(_)) => {
            return Err(Error::Unauthenticated {
                message: Some("Both x-user-id and x-auth-token are required".to_string()),
            });
        }
        (Some(user_id), Some(token)) => (user_id, token),
    };

    let user_id = user_id
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(Error::Unauthenticated {
            message: Some("Invalid x-user-id header".to_string()),
        })?;

    let token = token
        .to_str()
        .map_err(|_| Error::Unauthenticated {
            message: Some("Invalid x-auth-token header".to_string()),
        })?
        .to_string();

    Ok(Some((user_id, token)))
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let (user_id, token) = read_credentials(parts)?.ok_or(Error::Unauthenticated { message: None })?;

        let mut conn = state.db.acquire().await.map_err(DbError::from)?;
        let user = verify_token(&mut conn, user_id, &token).await?;

        trace!(user_id = %user.id, "authenticated request");
        Ok(AuthSession {
            user: CurrentUser::from(user),
            token,
        })
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        Ok(AuthSession::from_request_parts(parts, state).await?.user)
    }
}

/// Optional authentication for endpoints that mint guest identities.
///
/// `None` only when the request carried no credentials at all. Credentials
/// that are present but invalid still reject with 401; a stale token must
/// surface as an authentication failure, never silently become a fresh guest.
#[derive(Debug, Clone)]
pub struct MaybeSession(pub Option<AuthSession>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if read_credentials(parts)?.is_none() {
            return Ok(MaybeSession(None));
        }
        let session = AuthSession::from_request_parts(parts, state).await?;
        Ok(MaybeSession(Some(session)))
    }
}
