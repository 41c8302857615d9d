//! Speech synthesis adapter.
//!
//! Text reaching the TTS model is sanitized first: the engine chokes on
//! emoji and markup, and very long inputs blow the latency budget. All
//! synthesis failures are logged and swallowed; speech is an enhancement,
//! never a gate on the text conversation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::AudioClip;
use crate::gemini::GeminiClient;

/// Sample rate of Gemini TTS output.
pub const TTS_SAMPLE_RATE: u32 = 24_000;

/// Hard cap on synthesized input length.
const MAX_SPEECH_CHARS: usize = 400;
/// When truncating, prefer a sentence boundary at or past this point.
const MIN_BOUNDARY_CHARS: usize = 200;

/// Prepare text for the TTS engine.
///
/// Strips everything outside ASCII word characters, whitespace, and
/// `.,?!'-`, collapses whitespace runs, and truncates over-long input at
/// a late sentence boundary. Returns `None` when nothing speakable
/// remains (no letters or digits).
pub fn sanitize_for_speech(text: &str) -> Option<String> {
    let filtered: String = text
        .chars()
        .map(|c| {
            if c.is_whitespace() {
                ' '
            } else {
                c
            }
        })
        .filter(|&c| {
            c == ' '
                || c.is_ascii_alphanumeric()
                || matches!(c, '_' | '.' | ',' | '?' | '!' | '\'' | '-')
        })
        .collect();

    let mut collapsed = String::with_capacity(filtered.len());
    let mut last_space = true;
    for c in filtered.chars() {
        if c == ' ' {
            if !last_space {
                collapsed.push(' ');
            }
            last_space = true;
        } else {
            collapsed.push(c);
            last_space = false;
        }
    }
    let mut cleaned = collapsed.trim().to_string();

    if cleaned.len() > MAX_SPEECH_CHARS {
        cleaned.truncate(MAX_SPEECH_CHARS);
        let boundary = cleaned
            .rfind(['.', '?', '!'])
            .filter(|&pos| pos >= MIN_BOUNDARY_CHARS);
        if let Some(pos) = boundary {
            cleaned.truncate(pos + 1);
        }
    }

    if cleaned.chars().any(|c| c.is_ascii_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Sentence-to-clip synthesis seam. Failures are expressed as `None`,
/// never as errors.
#[async_trait::async_trait]
pub trait SentenceSynth: Send + Sync {
    async fn synthesize(&self, text: &str) -> Option<AudioClip>;
}

/// Turns sentences into audio clips via the Gemini TTS model.
#[derive(Clone)]
pub struct SpeechSynthesizer {
    client: Arc<GeminiClient>,
}

impl SpeechSynthesizer {
    pub fn new(client: Arc<GeminiClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SentenceSynth for SpeechSynthesizer {
    /// Synthesize one sentence. Unspeakable input and every failure mode
    /// return `None`; the caller's playback slot is filled either way.
    async fn synthesize(&self, text: &str) -> Option<AudioClip> {
        let cleaned = sanitize_for_speech(text)?;
        debug!(chars = cleaned.len(), "synthesizing sentence");
        match self.client.generate_speech(&cleaned).await {
            Ok(pcm) => Some(AudioClip::from_pcm16(&pcm, TTS_SAMPLE_RATE)),
            Err(e) => {
                warn!("speech synthesis failed: {e}");
                None
            }
        }
    }
}
