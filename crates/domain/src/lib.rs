//! Shared domain types for ChatRelay: the error enum, chat entities,
//! and the configuration surface.

pub mod chat;
pub mod config;
pub mod error;
