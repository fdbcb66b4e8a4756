//! Chat API endpoint.
//!
//! - `POST /v1/chat/stream` — SSE streaming: token deltas, loading
//!   status, and at most one terminal error event.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;
use uuid::Uuid;

use cr_domain::chat::{StreamingChunk, UserMessageInput};

use crate::pipeline::{prepare_exchange, run_exchange};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatStreamRequest {
    /// Conversation the message belongs to.
    pub chat_id: Uuid,
    /// User message text.
    pub message: String,
    /// Identifier the caller pre-allocated for the reply.
    pub response_message_id: Uuid,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat/stream (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatStreamRequest>,
) -> impl IntoResponse {
    let input = UserMessageInput {
        chat_id: body.chat_id,
        message: body.message,
        response_message_id: body.response_message_id,
    };

    // Assembly failures surface as a plain HTTP error before any chunk
    // is produced; nothing is persisted for the turn.
    let prepared = match prepare_exchange(&state, &input).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(chat_id = %input.chat_id, error = %e, "exchange assembly failed");
            return (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("assembly failed: {}", e.kind()) })),
            )
                .into_response();
        }
    };

    let rx = run_exchange(state, input, prepared);

    Sse::new(make_sse_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<StreamingChunk>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            let event_type = if chunk.error.is_some() { "error" } else { "chunk" };
            let data = serde_json::to_string(&chunk).unwrap_or_default();
            yield Ok(Event::default().event(event_type).data(data));
        }
    }
}
