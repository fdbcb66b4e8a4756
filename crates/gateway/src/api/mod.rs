pub mod chat;
pub mod token;

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::require_bearer;
use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (health and token issuance) and
/// **protected** (gated behind the bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/auth/token", post(token::issue_token));

    let protected = Router::new()
        .route("/v1/chat/stream", post(chat::chat_stream))
        .route_layer(middleware::from_fn_with_state(state, require_bearer));

    public.merge(protected)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
