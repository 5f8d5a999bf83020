pub mod chats;
pub mod messages;
pub mod pagination;
pub mod provider_keys;
pub mod users;
