//! Startup wiring: construct every collaborator from the config and
//! assemble the shared [`AppState`].

use std::sync::Arc;

use anyhow::Context;

use cr_domain::config::Config;
use cr_providers::OpenAiCompatProvider;
use cr_store::{LocalDocumentStore, LocalHistoryRepository};

use crate::auth::TokenSigner;
use crate::pipeline::validate::OutputValidator;
use crate::prompts::PromptCatalog;
use crate::state::AppState;

/// Build the shared application state.
///
/// The client secret is mandatory: without it no tokens can be issued or
/// verified, so startup fails. A missing provider API key only warns;
/// local endpoints such as Ollama accept unauthenticated requests.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let client_secret = std::env::var(&config.auth.client_secret_env).with_context(|| {
        format!(
            "client secret environment variable {} is not set",
            config.auth.client_secret_env
        )
    })?;

    let api_key = std::env::var(&config.provider.api_key_env).unwrap_or_else(|_| {
        tracing::warn!(
            var = %config.provider.api_key_env,
            "provider API key not set, sending unauthenticated requests"
        );
        String::new()
    });

    let prompts = PromptCatalog::load(
        &config.chat.prompts_dir,
        config.chat.companion_url.is_some(),
    )
    .context("loading prompt templates")?;

    let documents =
        LocalDocumentStore::load(&config.chat.documents_file).context("loading document store")?;
    let history = LocalHistoryRepository::new(&config.chat.conversations_dir)
        .context("opening conversation store")?;

    let provider =
        OpenAiCompatProvider::new(&config.provider, api_key).context("building model provider")?;

    let tokens = TokenSigner::new(
        config.auth.client_id.clone(),
        client_secret.into_bytes(),
        config.auth.token_ttl_secs,
    );

    Ok(AppState {
        config,
        documents: Arc::new(documents),
        history: Arc::new(history),
        provider: Arc::new(provider),
        prompts: Arc::new(prompts),
        tokens: Arc::new(tokens),
        validator: Arc::new(OutputValidator::new()),
    })
}
