//! Repository implementations for database access.
//!
//! This module provides repository structs for each major entity in the system.
//! Repositories follow a consistent pattern and implement the [`Repository`] trait.
//!
//! # Design Pattern
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed CRUD operations
//! - Handles query construction and parameter binding
//! - Returns domain models from [`crate::db::models`]
//!
//! # Available Repositories
//!
//! - [`Users`]: User accounts, device tokens, and authentication lookups
//! - [`Chats`]: Analysis chat containers and ownership checks
//! - [`Messages`]: Message history with chunked storage and usage rollups
//! - [`ProviderKeys`]: Stored model-provider credentials

pub mod chats;
pub mod messages;
pub mod provider_keys;
pub mod repository;
pub mod users;

pub use chats::Chats;
pub use messages::Messages;
pub use provider_keys::ProviderKeys;
pub use repository::Repository;
pub use users::Users;
