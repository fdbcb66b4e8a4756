//! Chat entities: the caller's input, the streamed output chunks, and the
//! raw model-event shape shared between the provider and the translator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Caller input
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One user message addressed to the assistant. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMessageInput {
    /// Conversation this message belongs to.
    pub chat_id: Uuid,
    /// The literal user message text.
    pub message: String,
    /// Identifier pre-allocated by the caller for the reply being produced.
    pub response_message_id: Uuid,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streamed output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A citation record attached to a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

/// A status payload emitted while the model is still working.
///
/// Parsed structurally at translation time; the gateway does not
/// interpret the contents beyond validating the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

/// One unit of streamed output delivered to the caller.
///
/// Chunks are emitted in model-generation order. A chunk carrying
/// `error` is terminal: the caller must not expect further chunks.
#[derive(Debug, Clone, Serialize)]
pub struct StreamingChunk {
    pub chat_id: Uuid,
    /// Incremental token text. May be empty (loading or error chunks).
    pub text: String,
    /// Citation records. Currently always empty in this core.
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_message: Option<LoadingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StreamingChunk {
    /// A chunk carrying incremental token text.
    pub fn token(chat_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            sources: Vec::new(),
            loading_message: None,
            error: None,
        }
    }

    /// A chunk carrying a loading-status payload and no text.
    pub fn loading(chat_id: Uuid, loading_message: LoadingMessage) -> Self {
        Self {
            chat_id,
            text: String::new(),
            sources: Vec::new(),
            loading_message: Some(loading_message),
            error: None,
        }
    }

    /// A terminal error chunk.
    pub fn error(chat_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: String::new(),
            sources: Vec::new(),
            loading_message: None,
            error: Some(error.into()),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Callback-channel events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The parsed shape of one raw callback-channel payload.
///
/// Providers publish JSON objects with the optional keys `token` and
/// `loading_message`. The keys are independent: a single event may carry
/// both, either, or neither. The translator checks them separately and
/// emits the token chunk before the loading chunk when both are present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_message: Option<serde_json::Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// History
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A prompt template with the conversation history substituted in,
/// paired with the rendered history text alone. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    pub template_with_history: String,
    pub formatted_history: String,
}
