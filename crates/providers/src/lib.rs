//! Model-provider adapters and the invocation contract the gateway
//! depends on.
//!
//! The gateway never talks to a provider API directly: it spawns
//! [`ModelProvider::complete`] as a background task holding the sending
//! half of an event channel, and drains the receiving half. See
//! [`traits`] for the channel contract.

mod openai_compat;
mod sse;
mod traits;

pub use openai_compat::OpenAiCompatProvider;
pub use traits::{loading_event, render_context, token_event, CompletionRequest, ModelProvider};
