//! Stream orchestration for one conversation turn.
//!
//! Consumes the model's event stream, mutating the transcript's trailing
//! AI message as text arrives, cutting sentences into playback slots, and
//! dispatching tool calls. A tool call ends the current stream; the
//! orchestrator feeds the result back and opens a continuation, up to
//! [`MAX_TOOL_HOPS`] dispatches per turn.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::sentence::SentenceBuffer;
use crate::audio::AudioPlaybackQueue;
use crate::backend::Collaborators;
use crate::error::Result;
use crate::gemini::request::{
    contents_from_history, function_response_turn, model_function_call_turn, user_turn,
};
use crate::gemini::{EventStream, GeminiClient, ImageAttachment, StreamEvent};
use crate::model::Message;
use crate::speech::SentenceSynth;
use crate::tools::{self, ToolCall};

/// Maximum tool dispatches in a single turn. Further calls are logged
/// and ignored; the turn finishes on whatever text the model produced.
pub const MAX_TOOL_HOPS: usize = 4;

/// Source of model event streams. Seam for driving the orchestrator with
/// scripted streams in tests.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Open the stream for a fresh user turn.
    async fn start(
        &self,
        history: &[Message],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<EventStream>;

    /// Open a continuation stream over explicit wire contents.
    async fn resume(&self, contents: Vec<Value>) -> Result<EventStream>;
}

#[async_trait]
impl StreamSource for GeminiClient {
    async fn start(
        &self,
        history: &[Message],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<EventStream> {
        self.start_chat_stream(history, text, image).await
    }

    async fn resume(&self, contents: Vec<Value>) -> Result<EventStream> {
        self.continue_with_tool_result(contents).await
    }
}

/// Drives one turn against a stream source.
pub struct Orchestrator<'a> {
    pub source: &'a dyn StreamSource,
    pub collaborators: &'a Collaborators,
    pub synth: Arc<dyn SentenceSynth>,
    pub audio: &'a AudioPlaybackQueue,
}

impl Orchestrator<'_> {
    /// Run a user turn to completion, appending to `transcript`.
    ///
    /// # Errors
    ///
    /// Stream-open failures, transport errors mid-stream, and tool
    /// dispatch failures (including `UnknownTool`) propagate; the
    /// transcript keeps whatever had arrived.
    pub async fn run_turn(
        &self,
        transcript: &mut Vec<Message>,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<()> {
        let mut contents = contents_from_history(transcript);
        contents.push(user_turn(text, image));
        let stream = self.source.start(transcript, text, image).await?;

        transcript.push(Message::user(text));
        self.consume(stream, transcript, contents).await
    }

    /// Stream a companion message into the transcript, speaking each
    /// sentence as it completes (the proactive greeting). Tool calls on
    /// such a stream have no turn to continue and are ignored; a stream
    /// error keeps whatever text had arrived.
    pub async fn speak_stream(&self, transcript: &mut Vec<Message>, mut stream: EventStream) {
        let mut buffer = SentenceBuffer::new();
        transcript.push(Message::ai(""));
        let idx = transcript.len() - 1;
        while let Some(event) = stream.next().await {
            match event {
                Ok(StreamEvent::TextDelta { text }) => {
                    transcript[idx].text.push_str(&text);
                    for sentence in buffer.push(&text) {
                        self.speak(sentence);
                    }
                }
                Ok(StreamEvent::FunctionCall { call }) => {
                    warn!(tool = %call.name, "ignoring tool call outside a user turn");
                }
                Err(e) => {
                    warn!("greeting stream failed: {e}");
                    break;
                }
            }
        }
        if let Some(rest) = buffer.flush() {
            self.speak(rest);
        }
        if transcript
            .get(idx)
            .is_some_and(Message::is_empty_placeholder)
        {
            transcript.remove(idx);
        }
    }

    /// Speak a companion message that arrives outside a streamed turn
    /// (the time-up notice).
    pub fn speak_text(&self, text: &str) {
        let mut buffer = SentenceBuffer::new();
        for sentence in buffer.push(text) {
            self.speak(sentence);
        }
        if let Some(rest) = buffer.flush() {
            self.speak(rest);
        }
    }

    async fn consume(
        &self,
        mut stream: EventStream,
        transcript: &mut Vec<Message>,
        mut contents: Vec<Value>,
    ) -> Result<()> {
        let mut buffer = SentenceBuffer::new();
        let mut hops = 0usize;

        transcript.push(Message::ai(""));
        let mut idx = transcript.len() - 1;

        loop {
            let mut pending_call: Option<ToolCall> = None;
            while let Some(event) = stream.next().await {
                match event? {
                    StreamEvent::TextDelta { text } => {
                        transcript[idx].text.push_str(&text);
                        for sentence in buffer.push(&text) {
                            self.speak(sentence);
                        }
                    }
                    StreamEvent::FunctionCall { call } => {
                        if hops >= MAX_TOOL_HOPS {
                            warn!(
                                tool = %call.name,
                                "tool hop limit reached, ignoring further calls"
                            );
                            continue;
                        }
                        pending_call = Some(call);
                        break;
                    }
                }
            }

            let Some(call) = pending_call else {
                // Stream exhausted: flush the unterminated tail once.
                if let Some(rest) = buffer.flush() {
                    self.speak(rest);
                }
                return Ok(());
            };

            hops += 1;
            // Text cut mid-sentence by a tool call is not spoken.
            buffer.clear();

            let visible = transcript[idx].text.clone();
            if visible.trim().is_empty() {
                transcript.remove(idx);
            } else {
                contents.push(json!({"role": "model", "parts": [{"text": visible}]}));
            }
            // The announcement goes into the continuation context too, so
            // the resumed model sees the same history the user does.
            let announcement = format!(
                "Calling tool: {} with arguments: {}",
                call.name, call.args
            );
            contents.push(json!({"role": "model", "parts": [{"text": announcement.clone()}]}));
            transcript.push(Message::ai(announcement));

            let result = tools::dispatch(&call, self.collaborators).await?;
            debug!(tool = %call.name, hop = hops, "tool result ready");
            contents.push(model_function_call_turn(&call));
            contents.push(function_response_turn(&call.name, result));

            stream = self.source.resume(contents.clone()).await?;
            transcript.push(Message::ai(""));
            idx = transcript.len() - 1;
        }
    }

    /// Reserve the next playback position and fill it off-task.
    fn speak(&self, sentence: String) {
        let slot = self.audio.reserve();
        let synth = self.synth.clone();
        tokio::spawn(async move {
            slot.fill(synth.synthesize(&sentence).await);
        });
    }
}
