//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure-style gateways, Ollama, vLLM, LM Studio, and
//! any other endpoint that follows the chat-completions wire format.
//! Fulfils the [`ModelProvider`](crate::ModelProvider) channel contract:
//! one status event before the request goes out, one token event per
//! streamed delta, final text as the return value.

use serde_json::Value;
use tokio::sync::mpsc;

use cr_domain::chat::LoadingMessage;
use cr_domain::config::ProviderConfig;
use cr_domain::error::{Error, Result};

use crate::sse::SseBuffer;
use crate::traits::{loading_event, render_context, token_event, CompletionRequest, ModelProvider};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A model adapter for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create an adapter from the provider config and the API key already
    /// read from the environment at startup.
    pub fn new(cfg: &ProviderConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            id: format!("openai-compat/{}", cfg.model),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            client,
        })
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let system = render_context(&req.system_message, &req.context);

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": system,
        })];
        if let Some(companion) = &req.companion_prompt {
            messages.push(serde_json::json!({
                "role": "system",
                "content": companion,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": req.user_message,
        }));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }

    fn provider_error(&self, message: impl Into<String>) -> Error {
        Error::Provider {
            provider: self.id.clone(),
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl ModelProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        req: CompletionRequest,
        events: mpsc::Sender<String>,
    ) -> Result<String> {
        // Status event first, so clients can show activity while the
        // connection is being established. Send failures mean the
        // consumer went away; generation continues so the final text can
        // still be persisted.
        let _ = events
            .send(loading_event(LoadingMessage {
                text: "contacting model".into(),
                progress: None,
            }))
            .await;

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_body(&req))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.provider_error(format!("HTTP {status}: {body}")));
        }

        let mut response = response;
        let mut buffer = SseBuffer::new();
        let mut full_text = String::new();
        let mut done = false;

        while !done {
            let payloads = match response.chunk().await {
                Ok(Some(bytes)) => buffer.push(&String::from_utf8_lossy(&bytes)),
                Ok(None) => {
                    let rest = std::mem::take(&mut buffer).finish();
                    done = true;
                    rest
                }
                Err(e) => return Err(self.provider_error(e.to_string())),
            };

            for payload in payloads {
                if payload == "[DONE]" {
                    done = true;
                    break;
                }
                if let Some(text) = delta_text(&payload)? {
                    full_text.push_str(&text);
                    let _ = events.send(token_event(&text)).await;
                }
            }
        }

        tracing::debug!(
            provider = %self.id,
            chars = full_text.len(),
            "completion stream finished"
        );

        // `events` is dropped here, closing the channel after the final
        // text is decided.
        Ok(full_text)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

/// Extract the incremental text from one chat-completions stream payload.
///
/// Payloads without a text delta (role announcements, finish chunks,
/// usage frames) yield `None`.
fn delta_text(payload: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(payload).map_err(Error::Json)?;
    Ok(value["choices"]
        .get(0)
        .and_then(|c| c["delta"]["content"].as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_text_extracts_content() {
        let payload = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(delta_text(payload).unwrap().as_deref(), Some("Hello"));
    }

    #[test]
    fn delta_text_none_for_role_announcement() {
        let payload = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert!(delta_text(payload).unwrap().is_none());
    }

    #[test]
    fn delta_text_none_for_finish_chunk() {
        let payload = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert!(delta_text(payload).unwrap().is_none());
    }

    #[test]
    fn delta_text_rejects_invalid_json() {
        assert!(delta_text("not json").is_err());
    }

    #[test]
    fn build_body_includes_companion_when_present() {
        let provider = OpenAiCompatProvider::new(&ProviderConfig::default(), "key".into()).unwrap();
        let req = CompletionRequest {
            system_message: "sys".into(),
            user_message: "hi".into(),
            context: vec![],
            companion_prompt: Some("companion".into()),
        };
        let body = provider.build_body(&req);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"], "companion");
        assert_eq!(messages[2]["role"], "user");
    }

    #[test]
    fn build_body_omits_companion_when_absent() {
        let provider = OpenAiCompatProvider::new(&ProviderConfig::default(), "key".into()).unwrap();
        let req = CompletionRequest {
            system_message: "sys".into(),
            user_message: "hi".into(),
            context: vec![],
            companion_prompt: None,
        };
        let body = provider.build_body(&req);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(body["stream"], true);
    }
}
