//! Process-wide configuration, deserialized from `config.toml`.
//!
//! Every section has serde defaults so a missing file (or a partial one)
//! still yields a runnable configuration. Secrets are never stored in the
//! file itself — the config names the environment variable that holds
//! them and the gateway reads it once at startup.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Auth
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Client identifier the token endpoint checks requests against.
    #[serde(default = "d_client_id")]
    pub client_id: String,
    /// Environment variable holding the client secret (also the token
    /// signing key). The gateway refuses to start if it is unset.
    #[serde(default = "d_client_secret_env")]
    pub client_secret_env: String,
    /// Lifetime of issued bearer tokens, in seconds.
    #[serde(default = "d_token_ttl")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: d_client_id(),
            client_secret_env: d_client_secret_env(),
            token_ttl_secs: d_token_ttl(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum number of retrieved document fragments injected into the
    /// prompt when the template carries a `{context}` marker.
    #[serde(default = "d_max_context_documents")]
    pub max_context_documents: usize,
    /// Number of most-recent turns rendered into the `{history}` block.
    #[serde(default = "d_history_turns")]
    pub history_turns: usize,
    /// Directory holding the prompt template files.
    #[serde(default = "d_prompts_dir")]
    pub prompts_dir: PathBuf,
    /// Directory for per-conversation history JSONL files.
    #[serde(default = "d_conversations_dir")]
    pub conversations_dir: PathBuf,
    /// JSONL corpus file backing the local document store.
    #[serde(default = "d_documents_file")]
    pub documents_file: PathBuf,
    /// Endpoint of the engine-companion feature. Presence toggles the
    /// companion prompt path; `None` disables it entirely.
    #[serde(default)]
    pub companion_url: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_context_documents: d_max_context_documents(),
            history_turns: d_history_turns(),
            prompts_dir: d_prompts_dir(),
            conversations_dir: d_conversations_dir(),
            documents_file: d_documents_file(),
            companion_url: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Model provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible chat completions endpoint.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the provider API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            temperature: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_port() -> u16 {
    8230
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_client_id() -> String {
    "chatrelay-client".into()
}
fn d_client_secret_env() -> String {
    "CHATRELAY_CLIENT_SECRET".into()
}
fn d_token_ttl() -> u64 {
    3600
}
fn d_max_context_documents() -> usize {
    5
}
fn d_history_turns() -> usize {
    10
}
fn d_prompts_dir() -> PathBuf {
    "prompts".into()
}
fn d_conversations_dir() -> PathBuf {
    "data/conversations".into()
}
fn d_documents_file() -> PathBuf {
    "data/documents.jsonl".into()
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_api_key_env() -> String {
    "CHATRELAY_PROVIDER_API_KEY".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.auth.client_id.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "auth.client_id".into(),
                message: "client_id must not be empty".into(),
            });
        }

        if self.auth.token_ttl_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "auth.token_ttl_secs".into(),
                message: "token lifetime must be greater than 0".into(),
            });
        }

        if self.chat.max_context_documents == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "chat.max_context_documents".into(),
                message: "context retrieval is effectively disabled".into(),
            });
        }

        if self.provider.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "provider.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        }

        if let Some(url) = &self.chat.companion_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "chat.companion_url".into(),
                    message: "companion_url does not look like an HTTP endpoint".into(),
                });
            }
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_all_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8230);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.auth.token_ttl_secs, 3600);
        assert_eq!(cfg.chat.max_context_documents, 5);
        assert_eq!(cfg.chat.history_turns, 10);
        assert!(cfg.chat.companion_url.is_none());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [chat]
            max_context_documents = 3
            companion_url = "http://localhost:9400"
        "#,
        )
        .unwrap();
        assert_eq!(cfg.chat.max_context_documents, 3);
        assert_eq!(cfg.chat.history_turns, 10);
        assert_eq!(
            cfg.chat.companion_url.as_deref(),
            Some("http://localhost:9400")
        );
        assert_eq!(cfg.server.port, 8230);
    }

    #[test]
    fn default_config_validates_clean() {
        let cfg = Config::default();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn zero_context_documents_is_a_warning() {
        let mut cfg = Config::default();
        cfg.chat.max_context_documents = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn non_http_companion_url_warns() {
        let mut cfg = Config::default();
        cfg.chat.companion_url = Some("ftp://nope".into());
        assert!(!cfg.validate().is_empty());
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError {
            severity: ConfigSeverity::Error,
            field: "server.host".into(),
            message: "host must not be empty".into(),
        };
        assert_eq!(e.to_string(), "[ERROR] server.host: host must not be empty");
    }
}
