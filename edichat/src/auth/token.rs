//! Opaque session token issuance and verification.
//!
//! Tokens carry no claims and are not self-validating: a token is good
//! exactly while its row exists in `user_tokens`. Verification is a database
//! membership check on every request, so logout and administrative revocation
//! take effect immediately.

use base64::{Engine as _, engine::general_purpose};
use rand::prelude::RngExt;
use rand::rng;
use sqlx::SqliteConnection;
use tracing::instrument;

use crate::db::handlers::Users;
use crate::db::models::users::UserDBResponse;
use crate::errors::{Error, Result};
use crate::types::{UserId, abbrev_uuid};

/// Device label recorded when the caller does not provide one.
pub const DEFAULT_DEVICE: &str = "web";

/// A freshly issued device credential.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub user_id: UserId,
    pub token: String,
    pub device: String,
}

/// Generate a secure random session token.
pub fn generate_session_token() -> String {
    // 32 bytes (256 bits) of cryptographically secure random data
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);

    // Encode as base64url without padding
    general_purpose::URL_SAFE_NO_PAD.encode(token_bytes)
}

/// Mints a new token for a user and records it against a device label.
/// Existing tokens for other devices are left untouched.
#[instrument(skip(db), fields(user_id = %abbrev_uuid(&user_id)), err)]
pub async fn issue_token(
    db: &mut SqliteConnection,
    user_id: UserId,
    device: Option<String>,
) -> Result<IssuedToken> {
    let token = generate_session_token();
    let device = device.unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    let row = Users::new(db).add_token(user_id, &token, &device).await?;
    Ok(IssuedToken {
        user_id: row.user_id,
        token: row.token,
        device: row.device,
    })
}

/// Verifies a presented `(user_id, token)` pair against current state.
///
/// Fails with an authentication error when the token does not resolve to the
/// named user, or when the account is banned. Revocation wins over ban-lift
/// ordering concerns because this is always a fresh read.
#[instrument(skip(db, token), fields(user_id = %abbrev_uuid(&user_id)))]
pub async fn verify_token(
    db: &mut SqliteConnection,
    user_id: UserId,
    token: &str,
) -> Result<UserDBResponse> {
    let user = Users::new(db)
        .resolve_token(user_id, token)
        .await?
        .ok_or(Error::Unauthenticated {
            message: Some("Invalid or expired session".to_string()),
        })?;

    if user.banned {
        return Err(Error::Unauthenticated {
            message: Some("Account suspended".to_string()),
        });
    }

    Ok(user)
}

/// Removes a single device token. Revoking an already-absent token is a
/// no-op.
#[instrument(skip(db, token), err)]
pub async fn revoke_token(db: &mut SqliteConnection, token: &str) -> Result<bool> {
    Ok(Users::new(db).remove_token(token).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Repository;
    use crate::db::models::users::{UserCreateDBRequest, UserUpdateDBRequest};
    use sqlx::SqlitePool;

    #[test]
    fn session_tokens_are_unpadded_base64url() {
        let token1 = generate_session_token();
        let token2 = generate_session_token();

        assert_ne!(token1, token2);
        // 43 chars for 32 bytes
        assert_eq!(token1.len(), 43);
        assert!(token1.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!token1.contains('='));
    }

    #[sqlx::test]
    async fn revoked_tokens_stop_verifying_immediately(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest::guest("Brisk Segment 0001".to_string()))
            .await
            .unwrap();

        let issued = issue_token(&mut conn, user.id, None).await.unwrap();
        assert!(verify_token(&mut conn, user.id, &issued.token).await.is_ok());

        assert!(revoke_token(&mut conn, &issued.token).await.unwrap());
        let err = verify_token(&mut conn, user.id, &issued.token).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn banned_users_fail_verification_with_live_tokens(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = Users::new(&mut conn)
            .create(&UserCreateDBRequest::guest("Brisk Segment 0002".to_string()))
            .await
            .unwrap();
        let issued = issue_token(&mut conn, user.id, Some("laptop".to_string())).await.unwrap();

        Users::new(&mut conn)
            .update(
                user.id,
                &UserUpdateDBRequest {
                    banned: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = verify_token(&mut conn, user.id, &issued.token).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn token_presented_with_wrong_user_id_fails(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = Users::new(&mut conn)
            .create(&UserCreateDBRequest::guest("Brisk Segment 0003".to_string()))
            .await
            .unwrap();
        let bob = Users::new(&mut conn)
            .create(&UserCreateDBRequest::guest("Brisk Segment 0004".to_string()))
            .await
            .unwrap();

        let issued = issue_token(&mut conn, alice.id, None).await.unwrap();
        assert!(verify_token(&mut conn, bob.id, &issued.token).await.is_err());
    }
}
