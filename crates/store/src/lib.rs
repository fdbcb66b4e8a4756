//! Storage collaborators for the gateway: the retrieval document store
//! and the conversation history repository. Both are trait seams so the
//! local JSONL-backed implementations can be swapped for real backends.

pub mod documents;
pub mod history;

pub use documents::{DocumentFragment, DocumentStore, LocalDocumentStore};
pub use history::{HistoryRepository, LocalHistoryRepository, TurnRecord};
