//! Database models for users and their device tokens.

use crate::types::UserId;
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub tos_accepted: bool,
    pub theme: Option<String>,
}

impl UserCreateDBRequest {
    /// Request for an implicitly created guest identity: generated name, no
    /// password, no email.
    pub fn guest(name: String) -> Self {
        Self {
            name,
            email: None,
            password_hash: None,
            is_guest: true,
            tos_accepted: false,
            theme: None,
        }
    }
}

/// Database request for updating a user.
///
/// `None` fields are left unchanged. Guest promotion is expressed as a field
/// update (email + password + `is_guest = false`) on the existing row, never a
/// new row, so chat ownership survives the upgrade.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_guest: Option<bool>,
    pub tos_accepted: Option<bool>,
    pub theme: Option<String>,
    pub banned: Option<bool>,
}

/// Database response for a user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub banned: bool,
    pub tos_accepted: bool,
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One active device credential for a user.
///
/// The full set of rows for a user is their token list: the sole source of
/// truth for authentication validity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserTokenDBResponse {
    pub token: String,
    pub user_id: UserId,
    pub device: String,
    pub issued_at: DateTime<Utc>,
}
