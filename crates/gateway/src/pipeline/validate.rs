//! Post-stream output validation.
//!
//! Flags URLs in the finished response text so operators can audit what
//! the model is linking to. Validation never blocks or alters the
//! response; findings go to the log only.

use regex::Regex;

/// Scans finished responses for URLs.
pub struct OutputValidator {
    url_re: Regex,
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputValidator {
    pub fn new() -> Self {
        // Matches http/https URLs up to whitespace or a closing bracket.
        let url_re =
            Regex::new(r#"https?://[^\s<>"')\]]+"#).expect("URL pattern is a valid regex");
        Self { url_re }
    }

    /// Log every URL found in `result`. Returns the number flagged.
    pub fn validate(&self, result: &str, chat_id: uuid::Uuid) -> usize {
        let mut count = 0;
        for m in self.url_re.find_iter(result) {
            tracing::info!(%chat_id, url = m.as_str(), "url in model response");
            count += 1;
        }
        count
    }
}
