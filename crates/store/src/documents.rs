//! Document retrieval store.
//!
//! The gateway only depends on the [`DocumentStore`] capability; the
//! bundled [`LocalDocumentStore`] loads a JSONL corpus into memory at
//! startup and answers queries with lowercase-word overlap scoring.
//! Index construction and real vector search are out of scope here.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cr_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Capability trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A retrieved document fragment injected into the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFragment {
    pub content: String,
    /// Where the fragment came from (file name, page title, ...).
    #[serde(default)]
    pub source: String,
}

/// Retrieval capability over any backend.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `k` fragments relevant to `query`, best first.
    async fn find(&self, query: &str, k: usize) -> Result<Vec<DocumentFragment>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local JSONL-backed store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory store loaded from a JSONL corpus file, one fragment per line.
///
/// Matching is word-overlap scoring: a fragment scores one point per
/// distinct query word it contains. Results are ordered by score
/// descending with corpus order as the tiebreaker, so output is
/// deterministic for a given corpus.
pub struct LocalDocumentStore {
    fragments: Vec<DocumentFragment>,
}

impl LocalDocumentStore {
    /// Load the corpus from `path`. A missing file yields an empty store
    /// (retrieval simply finds nothing); malformed lines are skipped with
    /// a warning.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "document corpus not found, starting empty");
            return Ok(Self {
                fragments: Vec::new(),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut fragments = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DocumentFragment>(line) {
                Ok(f) => fragments.push(f),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed corpus line");
                }
            }
        }

        tracing::info!(fragments = fragments.len(), "document corpus loaded");
        Ok(Self { fragments })
    }

    /// Build a store from fragments already in memory.
    pub fn from_fragments(fragments: Vec<DocumentFragment>) -> Self {
        Self { fragments }
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[async_trait::async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn find(&self, query: &str, k: usize) -> Result<Vec<DocumentFragment>> {
        let query_words: HashSet<String> = tokenize(query).into_iter().collect();
        if query_words.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, &DocumentFragment)> = self
            .fragments
            .iter()
            .filter_map(|f| {
                let words: HashSet<String> = tokenize(&f.content).into_iter().collect();
                let score = query_words.intersection(&words).count();
                (score > 0).then_some((score, f))
            })
            .collect();

        // Stable sort keeps corpus order for equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, f)| f.clone()).collect())
    }
}

/// Lowercase alphanumeric word split, shared by indexing and querying.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_owned)
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> LocalDocumentStore {
        LocalDocumentStore::from_fragments(vec![
            DocumentFragment {
                content: "The physics engine supports rigid bodies and joints".into(),
                source: "physics.md".into(),
            },
            DocumentFragment {
                content: "Shaders are compiled at import time".into(),
                source: "shaders.md".into(),
            },
            DocumentFragment {
                content: "Rigid bodies interact with the physics solver each frame".into(),
                source: "solver.md".into(),
            },
        ])
    }

    #[tokio::test]
    async fn find_orders_by_overlap_score() {
        let store = corpus();
        let hits = store.find("physics rigid bodies", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // First fragment matches all three query words.
        assert_eq!(hits[0].source, "physics.md");
        assert_eq!(hits[1].source, "solver.md");
    }

    #[tokio::test]
    async fn find_respects_k() {
        let store = corpus();
        let hits = store.find("physics rigid", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn find_with_no_match_is_empty() {
        let store = corpus();
        assert!(store.find("quaternions", 5).await.unwrap().is_empty());
        assert!(store.find("", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDocumentStore::load(&dir.path().join("absent.jsonl")).unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        std::fs::write(
            &path,
            "{\"content\":\"ok fragment here\",\"source\":\"a\"}\nnot json\n",
        )
        .unwrap();
        let store = LocalDocumentStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn tokenize_drops_single_chars_and_punctuation() {
        let words = tokenize("A rigid-body, solver!");
        assert_eq!(words, vec!["rigid", "body", "solver"]);
    }
}
