//! Proactive AI wellbeing companion core.
//!
//! A session opens with a calendar-aware check-in, streams model replies
//! while speaking them sentence by sentence, dispatches model tool calls
//! against external collaborators, and on completion files a diary entry
//! and updates the gamification ledger. A background scheduler raises
//! alerts for upcoming events and stress hotspots.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use eight::audio::AudioPlaybackQueue;
//! use eight::backend::Collaborators;
//! use eight::config::CompanionConfig;
//! use eight::gemini::GeminiClient;
//! use eight::scheduler::ScheduleHandle;
//! use eight::session::ChatSession;
//! use eight::speech::SpeechSynthesizer;
//!
//! # async fn run() -> eight::error::Result<()> {
//! let config = CompanionConfig::load_or_default();
//! let client = Arc::new(GeminiClient::new(config.gemini.clone()));
//! let mut session = ChatSession::new(
//!     client.clone(),
//!     Collaborators::mock(),
//!     Arc::new(SpeechSynthesizer::new(client)),
//!     AudioPlaybackQueue::new()?,
//!     ScheduleHandle::new(),
//! );
//! session.start().await;
//! session.send_message("I'm feeling a bit overwhelmed today.", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod gamification;
pub mod gemini;
pub mod model;
pub mod prompts;
pub mod scheduler;
pub mod session;
pub mod speech;
pub mod tools;

pub use error::{CompanionError, Result};
pub use session::ChatSession;
