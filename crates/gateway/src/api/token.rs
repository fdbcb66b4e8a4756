//! Token issuance endpoint.
//!
//! - `POST /v1/auth/token` — exchange client credentials for a bearer
//!   token scoped to a user.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
    /// The user the issued token will identify.
    pub user_id: String,
}

pub async fn issue_token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> impl IntoResponse {
    match state
        .tokens
        .issue(&body.client_id, &body.client_secret, &body.user_id)
    {
        Ok(issued) => Json(issued).into_response(),
        Err(e) => {
            tracing::warn!(client_id = %body.client_id, error = %e, "token issuance refused");
            (
                axum::http::StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid credentials" })),
            )
                .into_response()
        }
    }
}
