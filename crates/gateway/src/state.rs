use std::sync::Arc;

use cr_domain::config::Config;
use cr_providers::ModelProvider;
use cr_store::{DocumentStore, HistoryRepository};

use crate::auth::TokenSigner;
use crate::pipeline::validate::OutputValidator;
use crate::prompts::PromptCatalog;

/// Shared application state passed to all API handlers.
///
/// Collaborators are held behind trait objects so the local JSONL-backed
/// implementations can be swapped for real backends without touching the
/// pipeline.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Retrieval backend for `{context}` documents.
    pub documents: Arc<dyn DocumentStore>,
    /// Conversation history reader/writer.
    pub history: Arc<dyn HistoryRepository>,
    /// The model provider adapter.
    pub provider: Arc<dyn ModelProvider>,
    /// Prompt templates, loaded once at startup.
    pub prompts: Arc<PromptCatalog>,
    /// Bearer-token issuance and verification.
    pub tokens: Arc<TokenSigner>,
    /// Post-stream output validation (URL flagging).
    pub validator: Arc<OutputValidator>,
}
