//! ChatRelay gateway: HTTP surface, bearer-token auth, and the streaming
//! chat orchestration pipeline.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod pipeline;
pub mod prompts;
pub mod state;
