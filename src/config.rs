//! Companion configuration.
//!
//! Loaded from an optional TOML file (default
//! `~/.config/eight/config.toml`), with the Gemini credential overridable
//! from the `GEMINI_API_KEY` environment variable. A missing credential is
//! not a load error; it surfaces as
//! [`CompanionError::Configuration`](crate::error::CompanionError) the
//! first time an AI operation is attempted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompanionError, Result};

/// Environment variable carrying the Gemini API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionConfig {
    pub gemini: GeminiSettings,
    pub session: SessionSettings,
    pub notifications: NotificationSettings,
}

/// Gemini API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API credential. Usually left unset here and supplied via
    /// `GEMINI_API_KEY`.
    pub api_key: Option<String>,
    /// API base URL (overridable for tests).
    pub base_url: String,
    /// Model for chat, summaries, and structured extraction.
    pub chat_model: String,
    /// Model for speech synthesis.
    pub tts_model: String,
    /// Prebuilt voice identity for synthesis.
    pub voice: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".into(),
            chat_model: "gemini-2.5-flash".into(),
            tts_model: "gemini-2.5-flash-preview-tts".into(),
            voice: "Kore".into(),
        }
    }
}

/// Session behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Focused-session length in seconds.
    pub length_secs: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { length_secs: 480 }
    }
}

/// Notification scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Poll interval in seconds.
    pub poll_interval_secs: u64,
    /// How far ahead an item's start time may be to trigger an alert.
    pub lead_minutes: i64,
    /// Registered address for out-of-band stress alerts. The guest
    /// identity receives no email.
    pub user_email: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            lead_minutes: 15,
            user_email: crate::model::GUEST_EMAIL.into(),
        }
    }
}

impl CompanionConfig {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("eight").join("config.toml"))
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::Config` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CompanionError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|e| CompanionError::Config(format!("invalid config {}: {e}", path.display())))?;
        config.apply_env();
        Ok(config)
    }

    /// Load the default config file if present, else defaults. The
    /// environment override is applied either way.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_path()
            && path.exists()
            && let Ok(config) = Self::load(&path)
        {
            return config;
        }
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply process-environment overrides.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.gemini.api_key = Some(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CompanionConfig::default();
        assert_eq!(config.session.length_secs, 480);
        assert_eq!(config.notifications.poll_interval_secs, 10);
        assert_eq!(config.notifications.lead_minutes, 15);
        assert_eq!(config.notifications.user_email, crate::model::GUEST_EMAIL);
        assert_eq!(config.gemini.voice, "Kore");
        assert!(config.gemini.api_key.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => return,
        };
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[notifications]\nuser_email = \"me@example.com\"\npoll_interval_secs = 3\n",
        )
        .unwrap_or_default();

        let config = match CompanionConfig::load(&path) {
            Ok(c) => c,
            Err(e) => unreachable!("load failed: {e}"),
        };
        assert_eq!(config.notifications.user_email, "me@example.com");
        assert_eq!(config.notifications.poll_interval_secs, 3);
        // Untouched sections keep defaults.
        assert_eq!(config.session.length_secs, 480);
        assert_eq!(config.gemini.chat_model, "gemini-2.5-flash");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => return,
        };
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap_or_default();

        let err = CompanionConfig::load(&path);
        assert!(matches!(err, Err(CompanionError::Config(_))));
    }
}
