//! Authentication: registration, opaque session tokens, and guest identities.
//!
//! The model is deliberately plain. A user signs in (or is minted as a guest)
//! and receives an opaque random token bound to a device label. Every request
//! presents the `(user id, token)` pair in headers; the extractor in
//! [`current_user`] re-checks the pair against the `user_tokens` table on each
//! request, so revocation is immediate and there is no signed state to age
//! out.
//!
//! - [`password`]: Argon2id hashing and verification
//! - [`token`]: token generation, issuance, verification, revocation
//! - [`guest`]: implicit guest identity creation
//! - [`current_user`]: axum extractors for required and optional sessions

pub mod current_user;
pub mod guest;
pub mod password;
pub mod token;

pub use current_user::{AuthSession, MaybeSession};
pub use token::IssuedToken;
