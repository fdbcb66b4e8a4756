//! The streaming exchange pipeline.
//!
//! One request flows through two phases. `prepare_exchange` runs before
//! any chunk is produced: history substitution, context retrieval, and
//! the optional companion prompt. Failures there surface as plain HTTP
//! errors, never as a partial stream. `run_exchange` then spawns the
//! model call and hands back a chunk receiver; everything after that
//! point, including persistence, happens inside the spawned task so a
//! disconnecting consumer cannot skip finalization.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use cr_domain::chat::{LoadingMessage, ModelEvent, StreamingChunk, UserMessageInput};
use cr_domain::error::{Error, Result};
use cr_providers::CompletionRequest;
use cr_store::DocumentFragment;

use crate::state::AppState;

pub mod context;
pub mod history;
pub mod validate;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Preparation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything assembled before the first chunk: the fully substituted
/// system message, retrieved context, the optional companion prompt,
/// and the timestamp marking the end of assembly.
#[derive(Debug)]
pub struct PreparedExchange {
    pub system_message: String,
    pub context: Vec<DocumentFragment>,
    pub companion_prompt: Option<String>,
    pub request_ts: DateTime<Utc>,
}

/// Assemble an exchange: substitute history into the system template,
/// retrieve context if the template asks for it, and build the
/// companion prompt when companion mode is on.
pub async fn prepare_exchange(
    state: &AppState,
    input: &UserMessageInput,
) -> Result<PreparedExchange> {
    let chat_cfg = &state.config.chat;

    let with_history = history::add_history(
        state.prompts.system_message(),
        input.chat_id,
        state.history.as_ref(),
        chat_cfg.history_turns,
    )
    .await?;

    let context = context::assemble(
        &input.message,
        &with_history.template_with_history,
        state.documents.as_ref(),
        chat_cfg.max_context_documents,
    )
    .await?;

    let companion_prompt =
        history::companion_prompt(input, state.history.as_ref(), &state.prompts, chat_cfg).await?;

    Ok(PreparedExchange {
        system_message: with_history.template_with_history,
        context,
        companion_prompt,
        // Assembly is complete; the stored turn's request timestamp
        // marks this moment, not the arrival of the HTTP request.
        request_ts: Utc::now(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Start the model exchange and return the chunk stream.
///
/// The returned receiver yields token, loading, and error chunks in
/// order. Dropping it does not cancel the exchange; the spawned task
/// keeps running so the turn is persisted either way.
pub fn run_exchange(
    state: AppState,
    input: UserMessageInput,
    prepared: PreparedExchange,
) -> mpsc::Receiver<StreamingChunk> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(exchange_task(state, input, prepared, tx));
    rx
}

/// Drive one exchange end to end: model call, event translation, and
/// finalization. Persistence runs exactly once on every exit path.
async fn exchange_task(
    state: AppState,
    input: UserMessageInput,
    prepared: PreparedExchange,
    tx: mpsc::Sender<StreamingChunk>,
) {
    let chat_id = input.chat_id;
    let (event_tx, mut event_rx) = mpsc::channel::<String>(64);

    let req = CompletionRequest {
        system_message: prepared.system_message,
        user_message: input.message.clone(),
        context: prepared.context,
        companion_prompt: prepared.companion_prompt,
    };

    let provider = state.provider.clone();
    let mut task = tokio::spawn(async move { provider.complete(req, event_tx).await });

    // The provider drops its sender only after the final text is
    // decided, so draining the channel to closure and then awaiting the
    // task observes the complete event sequence before the result.
    let mut result = String::new();
    let outcome: Result<()> = async {
        while let Some(raw) = event_rx.recv().await {
            let event: ModelEvent = serde_json::from_str(&raw).map_err(Error::Json)?;
            // Empty payloads are skipped, not treated as malformed.
            if let Some(token) = event.token {
                if !token.is_empty() {
                    let _ = tx.send(StreamingChunk::token(chat_id, token)).await;
                }
            }
            if let Some(value) = event.loading_message {
                if status_payload_present(&value) {
                    let loading: LoadingMessage =
                        serde_json::from_value(value).map_err(Error::Json)?;
                    let _ = tx.send(StreamingChunk::loading(chat_id, loading)).await;
                }
            }
        }
        result = (&mut task)
            .await
            .map_err(|e| Error::Other(format!("model task failed: {e}")))??;
        Ok(())
    }
    .await;

    let response_ts = Utc::now();

    if let Err(e) = outcome {
        tracing::error!(%chat_id, error = %e, "exchange stream failed");
        // A translation failure leaves the model still generating;
        // stop it rather than let it run to completion unobserved.
        task.abort();
        let _ = tx
            .send(StreamingChunk::error(
                chat_id,
                format!("model error: {}", e.kind()),
            ))
            .await;
    }

    state.validator.validate(&result, chat_id);
    if let Err(e) = state
        .history
        .save_history(
            &input.message,
            &result,
            prepared.request_ts,
            response_ts,
            chat_id,
            input.response_message_id,
        )
        .await
    {
        tracing::error!(%chat_id, error = %e, "failed to persist conversation turn");
    }
}

/// A `null` or empty-object `loading_message` carries no status to show;
/// anything else must parse as a [`LoadingMessage`].
fn status_payload_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
