//! Database record structures matching table schemas.

pub mod chats;
pub mod messages;
pub mod provider_keys;
pub mod users;
