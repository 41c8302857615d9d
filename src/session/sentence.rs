//! Sentence segmentation for incremental speech.
//!
//! Deltas accumulate until a terminator (`.`, `?`, `!`) arrives; the
//! buffer then cuts everything through that terminator as one sentence.
//! Text after the last terminator stays buffered for the next delta, and
//! is flushed only once, at stream end.

/// Accumulates stream deltas and emits complete sentences.
#[derive(Debug, Default)]
pub struct SentenceBuffer {
    pending: String,
}

const TERMINATORS: [char; 3] = ['.', '?', '!'];

impl SentenceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta, returning any sentences it completed. Consecutive
    /// terminators produce punctuation-only cuts; the speech sanitizer
    /// rejects those downstream, so they are emitted as-is here.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.pending.push_str(delta);

        let mut sentences = Vec::new();
        while let Some(pos) = self.pending.find(TERMINATORS) {
            let cut: String = self.pending.drain(..=pos).collect();
            sentences.push(cut.trim().to_string());
        }
        sentences
    }

    /// Take whatever remains unterminated. Call once, when the stream is
    /// exhausted.
    pub fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }

    /// Discard buffered text without emitting it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_split_across_deltas() {
        let mut buffer = SentenceBuffer::new();
        assert!(buffer.push("Take a deep").is_empty());
        assert!(buffer.push(" breath").is_empty());
        assert_eq!(buffer.push(". Hold it"), vec!["Take a deep breath.".to_string()]);
        assert_eq!(buffer.push(" for four?"), vec!["Hold it for four?".to_string()]);
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn one_delta_can_complete_several_sentences() {
        let mut buffer = SentenceBuffer::new();
        let sentences = buffer.push("Nice! Keep going. Almost");
        assert_eq!(
            sentences,
            vec!["Nice!".to_string(), "Keep going.".to_string()]
        );
        assert_eq!(buffer.flush(), Some("Almost".to_string()));
    }

    #[test]
    fn flush_is_one_shot() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("tail without terminator");
        assert_eq!(buffer.flush(), Some("tail without terminator".to_string()));
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn consecutive_terminators_do_not_emit_blanks() {
        let mut buffer = SentenceBuffer::new();
        let sentences = buffer.push("Wow!!! Okay.");
        assert_eq!(
            sentences,
            vec![
                "Wow!".to_string(),
                "!".to_string(),
                "!".to_string(),
                "Okay.".to_string()
            ]
        );
    }

    #[test]
    fn cuts_are_trimmed() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("First.");
        let sentences = buffer.push("  Second one.  ");
        assert_eq!(sentences, vec!["Second one.".to_string()]);
        assert_eq!(buffer.flush(), None);
    }

    #[test]
    fn clear_discards_pending_text() {
        let mut buffer = SentenceBuffer::new();
        buffer.push("half a thought");
        buffer.clear();
        assert_eq!(buffer.flush(), None);
    }
}
