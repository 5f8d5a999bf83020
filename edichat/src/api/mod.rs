//! HTTP API surface: request/response models and axum handlers.

pub mod handlers;
pub mod models;
