//! Conversation session: transcript, turn lifecycle, diary, and ledger.

mod orchestrator;
mod sentence;

pub use orchestrator::{MAX_TOOL_HOPS, Orchestrator, StreamSource};
pub use sentence::SentenceBuffer;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::audio::AudioPlaybackQueue;
use crate::backend::Collaborators;
use crate::error::{CompanionError, Result};
use crate::gamification::GamificationState;
use crate::gemini::{GeminiClient, ImageAttachment};
use crate::model::{DiaryEntry, Message, Mood};
use crate::prompts;
use crate::scheduler::ScheduleHandle;
use crate::speech::SentenceSynth;

/// One user's conversation with the companion.
pub struct ChatSession {
    client: Arc<GeminiClient>,
    collaborators: Collaborators,
    synth: Arc<dyn SentenceSynth>,
    audio: AudioPlaybackQueue,
    schedule: ScheduleHandle,
    transcript: Vec<Message>,
    diary: Vec<DiaryEntry>,
    gamification: GamificationState,
    calendar_connected: bool,
    busy: bool,
    time_up_noted: bool,
}

impl ChatSession {
    pub fn new(
        client: Arc<GeminiClient>,
        collaborators: Collaborators,
        synth: Arc<dyn SentenceSynth>,
        audio: AudioPlaybackQueue,
        schedule: ScheduleHandle,
    ) -> Self {
        Self {
            client,
            collaborators,
            synth,
            audio,
            schedule,
            transcript: Vec::new(),
            diary: Vec::new(),
            gamification: GamificationState::default(),
            calendar_connected: false,
            busy: false,
            time_up_noted: false,
        }
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator {
            source: self.client.as_ref(),
            collaborators: &self.collaborators,
            synth: self.synth.clone(),
            audio: &self.audio,
        }
    }

    /// Open the conversation with the proactive check-in, speaking the
    /// greeting sentence by sentence as it streams in.
    ///
    /// A missing credential produces the fixed disabled-features message;
    /// every other failure falls back to a canned greeting inside the
    /// client, so this never leaves the transcript empty.
    pub async fn start(&mut self) {
        let stream = match self
            .client
            .run_proactive_check(self.collaborators.calendar.clone(), self.calendar_connected)
            .await
        {
            Ok(stream) => stream,
            Err(CompanionError::Configuration(msg)) => {
                warn!("AI features disabled: {msg}");
                self.transcript
                    .push(Message::ai(prompts::AI_DISABLED_MESSAGE));
                return;
            }
            Err(e) => {
                warn!("proactive check failed: {e}");
                let greeting = prompts::SCHEDULE_TROUBLE_GREETING;
                self.orchestrator().speak_text(greeting);
                self.transcript.push(Message::ai(greeting));
                return;
            }
        };
        let mut transcript = std::mem::take(&mut self.transcript);
        self.orchestrator().speak_stream(&mut transcript, stream).await;
        self.transcript = transcript;
    }

    /// Handle one user message. A no-op while a previous turn is still
    /// streaming.
    ///
    /// # Errors
    ///
    /// Only `UnknownTool` propagates; configuration and transient
    /// failures become fixed companion messages in the transcript.
    pub async fn send_message(
        &mut self,
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> Result<()> {
        if self.busy {
            warn!("turn already in progress, ignoring message");
            return Ok(());
        }
        if text.trim().is_empty() && image.is_none() {
            return Ok(());
        }
        self.busy = true;

        let mut transcript = std::mem::take(&mut self.transcript);
        let result = self
            .orchestrator()
            .run_turn(&mut transcript, text, image)
            .await;
        self.transcript = transcript;
        self.busy = false;

        match result {
            Ok(()) => Ok(()),
            Err(CompanionError::Configuration(msg)) => {
                warn!("AI features disabled: {msg}");
                self.drop_trailing_placeholder();
                self.transcript
                    .push(Message::ai(prompts::AI_DISABLED_MESSAGE));
                Ok(())
            }
            Err(e @ CompanionError::UnknownTool(_)) => Err(e),
            Err(e) => {
                warn!("turn failed: {e}");
                self.drop_trailing_placeholder();
                self.transcript
                    .push(Message::ai(prompts::GENERIC_ERROR_MESSAGE));
                Ok(())
            }
        }
    }

    /// Finish the session: summarize, update the ledger, file a diary
    /// entry, and reset the transcript for the next conversation.
    pub async fn end_session(&mut self, mood: Option<Mood>) -> Result<DiaryEntry> {
        let summary = match self.client.summarize(&self.transcript, mood).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "Session summary is unavailable right now.".to_string(),
            Err(CompanionError::Configuration(msg)) => {
                warn!("AI features disabled: {msg}");
                prompts::AI_DISABLED_MESSAGE.to_string()
            }
            Err(e) => {
                warn!("summary generation failed: {e}");
                "Session summary is unavailable right now.".to_string()
            }
        };

        let conversation = std::mem::take(&mut self.transcript);
        let entry = DiaryEntry::new(summary, conversation, mood);
        self.diary.push(entry.clone());
        self.gamification = self.gamification.record_session(Utc::now().date_naive());
        info!(
            points = self.gamification.points,
            streak = self.gamification.streak,
            "session recorded"
        );

        self.transcript
            .push(Message::ai(prompts::SESSION_SAVED_MESSAGE));
        self.time_up_noted = false;
        Ok(entry)
    }

    /// Log a mood without a conversation. Same ledger effect as a full
    /// session.
    pub fn quick_check_in(&mut self, mood: Mood) -> DiaryEntry {
        let entry = DiaryEntry::new(
            format!("Quick mood check-in: {mood}."),
            Vec::new(),
            Some(mood),
        );
        self.diary.push(entry.clone());
        self.gamification = self.gamification.record_session(Utc::now().date_naive());
        self.transcript
            .push(Message::ai(prompts::MOOD_LOGGED_MESSAGE));
        entry
    }

    /// Append the time-up notice. Subsequent calls are no-ops until the
    /// session is ended.
    pub fn append_time_up_message(&mut self) {
        if self.time_up_noted {
            return;
        }
        self.time_up_noted = true;
        self.orchestrator().speak_text(prompts::TIME_UP_MESSAGE);
        self.transcript.push(Message::ai(prompts::TIME_UP_MESSAGE));
    }

    /// Connect the calendar: load events into the schedule and run the
    /// stress analysis over them.
    pub async fn connect_calendar(&mut self) -> Result<()> {
        let events = self.collaborators.calendar.list_events().await?;
        self.calendar_connected = true;
        self.schedule.set_events(events.clone());

        match self.client.extract_stress_hotspots(&events).await {
            Ok(hotspots) => {
                info!(count = hotspots.len(), "stress hotspots identified");
                for hotspot in hotspots {
                    self.schedule.add_hotspot(hotspot);
                }
            }
            Err(e) => warn!("stress analysis failed: {e}"),
        }
        Ok(())
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn diary(&self) -> &[DiaryEntry] {
        &self.diary
    }

    pub fn gamification(&self) -> &GamificationState {
        &self.gamification
    }

    pub fn is_calendar_connected(&self) -> bool {
        self.calendar_connected
    }

    fn drop_trailing_placeholder(&mut self) {
        if self
            .transcript
            .last()
            .is_some_and(Message::is_empty_placeholder)
        {
            self.transcript.pop();
        }
    }
}
