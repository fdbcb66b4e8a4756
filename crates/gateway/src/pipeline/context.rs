//! Context assembly: retrieval gated on the `{context}` marker.

use cr_domain::error::Result;
use cr_store::{DocumentFragment, DocumentStore};

/// Marker in the system template that opts a request into retrieval.
pub const CONTEXT_MARKER: &str = "{context}";

/// Fetch context documents for `message` if the system template asks
/// for them.
///
/// A template without the marker skips retrieval entirely, so requests
/// that cannot use context never pay for a store round trip.
pub async fn assemble(
    message: &str,
    system_message: &str,
    store: &dyn DocumentStore,
    max_documents: usize,
) -> Result<Vec<DocumentFragment>> {
    if !system_message.contains(CONTEXT_MARKER) {
        return Ok(Vec::new());
    }

    let fragments = store.find(message, max_documents).await?;
    tracing::debug!(count = fragments.len(), "assembled context documents");
    Ok(fragments)
}
