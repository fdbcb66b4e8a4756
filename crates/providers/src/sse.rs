//! Minimal SSE body handling for streaming provider responses.
//!
//! Chat-completions endpoints stream `data:` lines separated by blank
//! lines. [`SseBuffer`] accumulates raw body bytes and hands back
//! complete payloads as they become available, leaving any trailing
//! partial event buffered for the next chunk.

/// Incremental SSE payload extractor.
#[derive(Default)]
pub(crate) struct SseBuffer {
    pending: String,
}

impl SseBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk, returning every complete `data:` payload it
    /// unlocked, in order.
    pub(crate) fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut payloads = Vec::new();

        while let Some(pos) = self.pending.find("\n\n") {
            let block = self.pending[..pos].to_owned();
            self.pending.drain(..pos + 2);
            collect_data_lines(&block, &mut payloads);
        }

        payloads
    }

    /// Flush whatever remains once the body has closed. Some servers end
    /// the stream without a trailing blank line.
    pub(crate) fn finish(mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        if !self.pending.trim().is_empty() {
            let block = std::mem::take(&mut self.pending);
            collect_data_lines(&block, &mut payloads);
        }
        payloads
    }
}

fn collect_data_lines(block: &str, out: &mut Vec<String>) {
    for line in block.lines() {
        if let Some(data) = line.trim().strip_prefix("data:") {
            let data = data.trim();
            if !data.is_empty() {
                out.push(data.to_owned());
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_event_in_one_chunk() {
        let mut buf = SseBuffer::new();
        let payloads = buf.push("event: message\ndata: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn event_split_across_chunks() {
        let mut buf = SseBuffer::new();
        assert!(buf.push("data: par").is_empty());
        let payloads = buf.push("tial\n\n");
        assert_eq!(payloads, vec!["partial"]);
    }

    #[test]
    fn multiple_events_per_chunk() {
        let mut buf = SseBuffer::new();
        let payloads = buf.push("data: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn non_data_lines_ignored() {
        let mut buf = SseBuffer::new();
        let payloads = buf.push("id: 3\nretry: 100\ndata: keep\n\n");
        assert_eq!(payloads, vec!["keep"]);
    }

    #[test]
    fn empty_data_line_skipped() {
        let mut buf = SseBuffer::new();
        assert!(buf.push("data: \n\n").is_empty());
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut buf = SseBuffer::new();
        assert!(buf.push("data: tail").is_empty());
        assert_eq!(buf.finish(), vec!["tail"]);
    }

    #[test]
    fn finish_on_clean_end_is_empty() {
        let mut buf = SseBuffer::new();
        buf.push("data: done\n\n");
        assert!(buf.finish().is_empty());
    }

    #[test]
    fn done_sentinel_passes_through() {
        let mut buf = SseBuffer::new();
        let payloads = buf.push("data: [DONE]\n\n");
        assert_eq!(payloads, vec!["[DONE]"]);
    }
}
