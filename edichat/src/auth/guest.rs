//! Implicit guest identity creation.
//!
//! Callers without credentials who perform a creating action get a full user
//! row minted on the fly: generated display name, no email, no password,
//! `is_guest` set. The row is identical in shape to a registered user's, so a
//! later claim is a plain field update and everything the guest created stays
//! attached to the same id.

use rand::prelude::RngExt;
use rand::rng;
use sqlx::SqliteConnection;
use tracing::instrument;

use crate::auth::token::{IssuedToken, issue_token};
use crate::db::errors::DbError;
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use crate::errors::{Error, Result};

/// Attempts at a unique generated name before giving up.
const NAME_ATTEMPTS: usize = 3;

/// Generate a random document-themed display name
/// Format: "{adjective} {noun} {4-digit number}"
/// Example: "Brisk Ledger 4729"
pub fn generate_guest_name() -> String {
    const ADJECTIVES: &[&str] = &[
        "Brisk",
        "Candid",
        "Diligent",
        "Earnest",
        "Fluent",
        "Keen",
        "Lucid",
        "Nimble",
        "Prompt",
        "Quiet",
        "Sharp",
        "Steady",
        "Terse",
        "Tidy",
        "Vivid",
    ];

    const NOUNS: &[&str] = &[
        "Ledger",
        "Invoice",
        "Manifest",
        "Segment",
        "Envelope",
        "Parser",
        "Shipment",
        "Order",
        "Dispatch",
        "Courier",
        "Broker",
        "Auditor",
        "Clerk",
        "Archivist",
        "Translator",
    ];

    let mut rng = rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number = rng.random_range(1000..10000);

    format!("{} {} {}", adjective, noun, number)
}

/// Creates a guest user and a first device token for it.
///
/// Name generation retries a few times on collision; the namespace is large
/// enough that repeated failures indicate something else is wrong.
#[instrument(skip(db), err)]
pub async fn create_guest(
    db: &mut SqliteConnection,
    device: Option<String>,
) -> Result<(UserDBResponse, IssuedToken)> {
    for _ in 0..NAME_ATTEMPTS {
        let name = generate_guest_name();
        match Users::new(&mut *db).create(&UserCreateDBRequest::guest(name)).await {
            Ok(user) => {
                let token = issue_token(db, user.id, device.clone()).await?;
                return Ok((user, token));
            }
            Err(DbError::UniqueViolation { column, .. }) if column.as_deref() == Some("name") => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Internal {
        operation: format!("generate a unique guest name in {NAME_ATTEMPTS} attempts"),
    })
}
