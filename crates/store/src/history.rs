//! Conversation history repository.
//!
//! Each conversation gets a `<chat_id>.jsonl` file under the configured
//! directory; every completed turn is appended as a single JSON line.
//! An in-memory write-through cache keeps reads off disk after the first
//! load, and writes go through `spawn_blocking` to keep file I/O off the
//! tokio runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cr_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capability trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// History persistence capability over any backend.
#[async_trait::async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Render the `max_turns` most recent turns of a conversation into a
    /// prompt-ready text block. `max_turns = 0` renders the empty string.
    async fn get_prompt_history(&self, chat_id: Uuid, max_turns: usize) -> Result<String>;

    /// Durably record one completed turn. Called exactly once per request.
    #[allow(clippy::too_many_arguments)]
    async fn save_history(
        &self,
        input_message: &str,
        output_message: &str,
        request_ts: DateTime<Utc>,
        response_ts: DateTime<Utc>,
        chat_id: Uuid,
        response_message_id: Uuid,
    ) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One persisted user-message/assistant-response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub user_message: String,
    pub assistant_message: String,
    pub request_ts: DateTime<Utc>,
    pub response_ts: DateTime<Utc>,
    pub response_message_id: Uuid,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local JSONL-backed repository
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Append-only per-conversation JSONL files with a write-through cache.
pub struct LocalHistoryRepository {
    base_dir: PathBuf,
    cache: RwLock<HashMap<Uuid, Vec<TurnRecord>>>,
}

impl LocalHistoryRepository {
    /// Create the repository, ensuring the base directory exists.
    pub fn new(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir).map_err(Error::Io)?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn chat_path(&self, chat_id: Uuid) -> PathBuf {
        self.base_dir.join(format!("{chat_id}.jsonl"))
    }

    /// Load a conversation's turns, from cache when possible.
    fn read_turns(&self, chat_id: Uuid) -> Result<Vec<TurnRecord>> {
        {
            let cache = self.cache.read();
            if let Some(turns) = cache.get(&chat_id) {
                return Ok(turns.clone());
            }
        }

        let turns = read_jsonl_file(&self.chat_path(chat_id), chat_id)?;
        self.cache.write().insert(chat_id, turns.clone());
        Ok(turns)
    }
}

#[async_trait::async_trait]
impl HistoryRepository for LocalHistoryRepository {
    async fn get_prompt_history(&self, chat_id: Uuid, max_turns: usize) -> Result<String> {
        if max_turns == 0 {
            return Ok(String::new());
        }
        let turns = self.read_turns(chat_id)?;
        Ok(render_turns(&turns, max_turns))
    }

    async fn save_history(
        &self,
        input_message: &str,
        output_message: &str,
        request_ts: DateTime<Utc>,
        response_ts: DateTime<Utc>,
        chat_id: Uuid,
        response_message_id: Uuid,
    ) -> Result<()> {
        let record = TurnRecord {
            user_message: input_message.to_owned(),
            assistant_message: output_message.to_owned(),
            request_ts,
            response_ts,
            response_message_id,
        };

        let mut line = serde_json::to_string(&record).map_err(Error::Json)?;
        line.push('\n');
        let path = self.chat_path(chat_id);

        // Write to disk first; the cache is only updated if I/O succeeds.
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(Error::Io)?;
            file.write_all(line.as_bytes()).map_err(Error::Io)?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Store(format!("spawn_blocking join: {e}")))??;

        self.cache.write().entry(chat_id).or_default().push(record);

        tracing::debug!(%chat_id, "turn persisted");
        Ok(())
    }
}

/// Render the tail of a conversation as alternating `User:`/`Assistant:`
/// lines, oldest first.
fn render_turns(turns: &[TurnRecord], max_turns: usize) -> String {
    let start = turns.len().saturating_sub(max_turns);
    let mut out = String::new();
    for turn in &turns[start..] {
        out.push_str("User: ");
        out.push_str(&turn.user_message);
        out.push('\n');
        out.push_str("Assistant: ");
        out.push_str(&turn.assistant_message);
        out.push('\n');
    }
    out
}

/// Read and parse a JSONL history file; malformed lines are skipped.
fn read_jsonl_file(path: &Path, chat_id: Uuid) -> Result<Vec<TurnRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
    let mut turns = Vec::new();
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TurnRecord>(line) {
            Ok(t) => turns.push(t),
            Err(e) => {
                tracing::warn!(%chat_id, error = %e, "skipping malformed history line");
            }
        }
    }
    Ok(turns)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
