//! HTTP request handlers.
//!
//! Handlers stay thin: extract identity, validate input, delegate to the
//! repositories, and shape the response. Ownership checks always go through
//! the owned-lookup helpers so a missing resource and somebody else's
//! resource are indistinguishable to the caller.

pub mod auth;
pub mod chats;
pub mod provider_keys;
pub mod users;
