use cr_domain::chat::{LoadingMessage, ModelEvent};
use cr_domain::error::Result;
use cr_store::DocumentFragment;
use tokio::sync::mpsc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic completion request, assembled by the pipeline
/// before the background task starts.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System message with history already substituted. May still carry a
    /// `{context}` placeholder for the adapter to fill from `context`.
    pub system_message: String,
    /// The literal user message.
    pub user_message: String,
    /// Retrieved document fragments for the `{context}` placeholder.
    pub context: Vec<DocumentFragment>,
    /// Fully rendered companion-feature prompt, when that path is
    /// enabled. `None` means the feature is off for this deployment.
    pub companion_prompt: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every model adapter must implement.
///
/// ## Channel contract
///
/// `events` is the sending half of a single-producer/single-consumer
/// channel. Each item is a JSON-encoded object with the optional keys
/// `token` (incremental text) and `loading_message` (status payload);
/// both may appear on one event. Events arrive at the consumer in
/// emission order, none dropped or duplicated.
///
/// Implementations must drop the sender (closing the channel) only after
/// the final result text is decided, so channel exhaustion
/// happens-before the task-result read on the consumer side. The
/// returned string is the authoritative full response; the consumer
/// never reconstructs it from streamed tokens.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run the full provider dialogue, publishing streaming events and
    /// returning the complete response text.
    async fn complete(
        &self,
        req: CompletionRequest,
        events: mpsc::Sender<String>,
    ) -> Result<String>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event construction helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Encode a token event for the callback channel.
pub fn token_event(text: &str) -> String {
    let event = ModelEvent {
        token: Some(text.to_owned()),
        loading_message: None,
    };
    // ModelEvent is two optional fields; serialization cannot fail.
    serde_json::to_string(&event).unwrap_or_default()
}

/// Encode a loading-status event for the callback channel.
pub fn loading_event(message: LoadingMessage) -> String {
    let event = ModelEvent {
        token: None,
        loading_message: serde_json::to_value(&message).ok(),
    };
    serde_json::to_string(&event).unwrap_or_default()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context rendering
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Substitute retrieved fragments into the first `{context}` placeholder.
///
/// A template without the marker is returned unchanged; an empty
/// fragment list substitutes the empty string.
pub fn render_context(system_message: &str, fragments: &[DocumentFragment]) -> String {
    if !system_message.contains("{context}") {
        return system_message.to_owned();
    }
    let rendered: Vec<String> = fragments
        .iter()
        .map(|f| {
            if f.source.is_empty() {
                f.content.clone()
            } else {
                format!("[{}]\n{}", f.source, f.content)
            }
        })
        .collect();
    system_message.replacen("{context}", &rendered.join("\n\n"), 1)
}
