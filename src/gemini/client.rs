//! Gemini API client.
//!
//! Every public operation checks the credential before touching the
//! network, so a missing `GEMINI_API_KEY` surfaces as
//! [`CompanionError::Configuration`] without a request ever leaving the
//! process.

use std::sync::Arc;

use base64::Engine;
use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use super::events::{EventStream, StreamEvent};
use super::parse;
use super::request::{self, ImageAttachment};
use super::sse::SseParser;
use crate::backend::CalendarService;
use crate::config::GeminiSettings;
use crate::error::{CompanionError, Result};
use crate::model::{CalendarEvent, Message, Mood, StressHotspot};
use crate::prompts;
use crate::tools;

/// Kind of guided-audio script to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Meditation,
    SleepStory,
}

/// Client for chat streaming, one-shot generation, structured extraction,
/// and speech synthesis against the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    /// The configured credential.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::Configuration` when no key is set.
    fn credential(&self) -> Result<&str> {
        self.settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CompanionError::Configuration(format!(
                    "{} is not set",
                    crate::config::API_KEY_ENV
                ))
            })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.settings.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// Open a chat stream for the latest user turn, with the tool
    /// declarations advertised.
    pub async fn start_chat_stream(
        &self,
        history: &[Message],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<EventStream> {
        let mut contents = request::contents_from_history(history);
        contents.push(request::user_turn(text, image));
        let body = request::chat_body(
            contents,
            &prompts::chat_system_instruction(),
            Some(tools::declarations()),
        );
        self.open_stream(&self.settings.chat_model, body).await
    }

    /// Continue a turn after a tool result. No declarations are attached
    /// to the resumed stream; the model is expected to answer with text.
    /// Should it emit a call anyway, the orchestrator still handles it.
    pub async fn continue_with_tool_result(&self, contents: Vec<Value>) -> Result<EventStream> {
        let body = request::chat_body(contents, &prompts::chat_system_instruction(), None);
        self.open_stream(&self.settings.chat_model, body).await
    }

    /// Run the proactive morning check-in, returning the greeting as an
    /// event stream so sentences can be spoken as they arrive.
    ///
    /// Without a calendar connection this is a canned one-event stream,
    /// no model call. With one, the model is prompted with only the
    /// calendar-read tool declared: if it requests the tool, the
    /// schedule is fetched and fed back, and the second stream's deltas
    /// are forwarded as they arrive; if it answers directly, that text
    /// is the stream. Service failures become canned fallback text, an
    /// all-whitespace reply becomes the empty-check greeting, but a
    /// missing credential propagates.
    pub async fn run_proactive_check(
        &self,
        calendar: Arc<dyn CalendarService>,
        calendar_connected: bool,
    ) -> Result<EventStream> {
        if !calendar_connected {
            return Ok(canned_stream(prompts::NO_CALENDAR_GREETING));
        }
        let mut inner = match self.proactive_stream(calendar).await {
            Ok(stream) => stream,
            Err(e @ CompanionError::Configuration(_)) => return Err(e),
            Err(e) => {
                warn!("proactive check failed: {e}");
                return Ok(canned_stream(prompts::SCHEDULE_TROUBLE_GREETING));
            }
        };

        let stream = async_stream::stream! {
            let mut spoke = false;
            while let Some(event) = inner.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        if !text.trim().is_empty() {
                            spoke = true;
                        }
                        yield Ok(StreamEvent::TextDelta { text });
                    }
                    Ok(StreamEvent::FunctionCall { .. }) => {}
                    Err(e) => {
                        warn!("proactive check failed: {e}");
                        yield Ok(StreamEvent::TextDelta {
                            text: prompts::SCHEDULE_TROUBLE_GREETING.to_string(),
                        });
                        return;
                    }
                }
            }
            if !spoke {
                yield Ok(StreamEvent::TextDelta {
                    text: prompts::EMPTY_CHECK_GREETING.to_string(),
                });
            }
        };
        Ok(Box::pin(stream) as EventStream)
    }

    async fn proactive_stream(&self, calendar: Arc<dyn CalendarService>) -> Result<EventStream> {
        let mut contents = vec![request::user_turn(prompts::PROACTIVE_PROMPT, None)];
        let body = request::chat_body(
            contents.clone(),
            &prompts::chat_system_instruction(),
            Some(tools::calendar_read_declaration()),
        );
        let mut stream = self.open_stream(&self.settings.chat_model, body).await?;

        let mut direct = String::new();
        let mut schedule_request = None;
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text: delta } => direct.push_str(&delta),
                StreamEvent::FunctionCall { call } => {
                    schedule_request = Some(call);
                    break;
                }
            }
        }
        let Some(call) = schedule_request else {
            // Model answered directly without reading the calendar.
            return Ok(canned_stream(&direct));
        };

        let events = calendar.list_events().await?;
        let result = serde_json::to_value(&events)
            .map_err(|e| CompanionError::ToolParse(format!("event serialization: {e}")))?;
        contents.push(request::model_function_call_turn(&call));
        contents.push(request::function_response_turn(&call.name, result));
        let body = request::chat_body(contents, &prompts::chat_system_instruction(), None);
        self.open_stream(&self.settings.chat_model, body).await
    }

    /// Summarize a finished session for the diary.
    pub async fn summarize(&self, transcript: &[Message], mood: Option<Mood>) -> Result<String> {
        let conversation = transcript
            .iter()
            .filter(|m| !m.is_empty_placeholder())
            .map(|m| {
                let who = match m.sender {
                    crate::model::Sender::User => "User",
                    crate::model::Sender::Ai => "Companion",
                };
                format!("{who}: {}", m.text)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let mood_note = mood
            .map(|m| format!(" The user reported their mood as \"{m}\"."))
            .unwrap_or_default();
        let prompt = format!(
            "Write a gentle 2-3 sentence summary of this wellbeing conversation for the user's \
             private diary. Focus on how they felt and what helped.{mood_note}\n\n{conversation}"
        );
        self.generate_text(&prompt, prompts::SAFETY_SYSTEM_INSTRUCTION)
            .await
    }

    /// Generate a guided meditation or sleep story script.
    pub async fn generate_script(&self, kind: ScriptKind, theme: &str) -> Result<String> {
        let (instruction, label) = match kind {
            ScriptKind::Meditation => (prompts::MEDITATION_SYSTEM_INSTRUCTION, "guided meditation"),
            ScriptKind::SleepStory => (prompts::SLEEP_STORY_SYSTEM_INSTRUCTION, "sleep story"),
        };
        let prompt = format!("Write a {label} about: {theme}");
        self.generate_text(&prompt, instruction).await
    }

    /// Ask the model to flag stressful windows in a day's calendar.
    ///
    /// Best-effort: a response that is not valid hotspot JSON (even after
    /// fence stripping) yields an empty list, never an error.
    pub async fn extract_stress_hotspots(
        &self,
        events: &[CalendarEvent],
    ) -> Result<Vec<StressHotspot>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let schedule = serde_json::to_string(events).unwrap_or_else(|_| "[]".into());
        let prompt = format!(
            "Analyze this calendar and identify up to 3 time windows likely to be stressful \
             (back-to-back meetings, deadlines, long blocks without breaks). Respond with a JSON \
             array of objects with keys \"startTime\", \"endTime\", \"reason\" (ISO-8601 times, \
             short reasons). Respond with [] if nothing stands out.\n\nCalendar: {schedule}"
        );
        let body = request::json_body(&prompt, prompts::SAFETY_SYSTEM_INSTRUCTION);
        let response = self.generate(&self.settings.chat_model, body).await?;
        let text = parse::extract_text(&response);
        match serde_json::from_str::<Vec<StressHotspot>>(parse::strip_code_fence(&text)) {
            Ok(hotspots) => Ok(hotspots),
            Err(e) => {
                warn!("hotspot analysis returned unparseable output: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Synthesize speech, returning raw 16-bit PCM at 24 kHz mono.
    pub async fn generate_speech(&self, text: &str) -> Result<Vec<u8>> {
        let body = request::speech_body(text, &self.settings.voice);
        let response = self.generate(&self.settings.tts_model, body).await?;
        let encoded = parse::extract_inline_audio(&response)
            .ok_or_else(|| CompanionError::Synthesis("response carried no audio data".into()))?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| CompanionError::Synthesis(format!("invalid audio base64: {e}")))
    }

    async fn generate_text(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        let body = request::text_body(prompt, system_instruction);
        let response = self.generate(&self.settings.chat_model, body).await?;
        Ok(parse::extract_text(&response).trim().to_string())
    }

    /// One-shot generateContent call.
    async fn generate(&self, model: &str, body: Value) -> Result<Value> {
        let key = self.credential()?.to_string();
        let url = self.endpoint(model, "generateContent");
        debug!(%model, "gemini generate");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompanionError::Service(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompanionError::Service(format!(
                "gemini returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| CompanionError::Service(format!("invalid response body: {e}")))
    }

    /// Streaming generateContent call, normalized to [`StreamEvent`]s.
    async fn open_stream(&self, model: &str, body: Value) -> Result<EventStream> {
        let key = self.credential()?.to_string();
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        debug!(%model, "gemini stream");
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompanionError::Service(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CompanionError::Service(format!(
                "gemini returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut parser = SseParser::new();
            while let Some(chunk) = bytes.next().await {
                let chunk: bytes::Bytes =
                    chunk.map_err(|e| CompanionError::Service(format!("stream read: {e}")))?;
                for payload in parser.push(&chunk) {
                    for event in parse::parse_stream_chunk(&payload) {
                        yield event;
                    }
                }
            }
            if let Some(payload) = parser.finish() {
                for event in parse::parse_stream_chunk(&payload) {
                    yield event;
                }
            }
        };
        Ok(Box::pin(stream) as EventStream)
    }
}

/// A one-event stream carrying fixed text.
fn canned_stream(text: &str) -> EventStream {
    let event = StreamEvent::TextDelta {
        text: text.to_string(),
    };
    Box::pin(futures_util::stream::iter([Ok(event)]))
}
