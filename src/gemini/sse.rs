//! Incremental server-sent-events framing.
//!
//! Network chunks can split an SSE frame anywhere, so the parser buffers
//! partial lines across [`SseParser::push`] calls and only emits the
//! payload of complete `data:` lines. Non-data lines (comments, event
//! names, blank separators) are dropped.

/// Incremental parser for an SSE byte stream.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning the payloads of any `data:` lines
    /// completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(payload) = Self::data_payload(line.trim_end_matches(['\n', '\r'])) {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }

    /// Flush any trailing line missing its newline at stream end.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::data_payload(line.trim_end_matches(['\n', '\r'])).map(str::to_string)
    }

    fn data_payload(line: &str) -> Option<&str> {
        let rest = line.strip_prefix("data:")?;
        let payload = rest.strip_prefix(' ').unwrap_or(rest);
        if payload.is_empty() || payload == "[DONE]" {
            None
        } else {
            Some(payload)
        }
    }
}
