//! Domain types shared across the companion core.
//!
//! Timestamps on calendar items are kept as the ISO-8601 strings the
//! external collaborators and the model exchange; [`parse_timestamp`]
//! interprets them when the scheduler needs real instants. Identity keys
//! for notification dedup are derived from the discriminating fields, not
//! from generated ids.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anonymous identity used when no account email is known. Side-channel
/// emails are skipped for this address.
pub const GUEST_EMAIL: &str = "guest@eight.app";

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human user.
    User,
    /// The companion.
    Ai,
}

/// One message in the conversation transcript.
///
/// The transcript is append-only during a session; the text of the
/// in-progress AI message mutates incrementally while its stream runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id within the session.
    pub id: String,
    /// Visible text.
    pub text: String,
    /// Message author.
    pub sender: Sender,
}

impl Message {
    /// Create a message with a fresh id.
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
        }
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    /// Create an AI message.
    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }

    /// Whether this is an empty AI placeholder awaiting stream text.
    /// Such entries are skipped when building model context.
    pub fn is_empty_placeholder(&self) -> bool {
        self.sender == Sender::Ai && self.text.trim().is_empty()
    }
}

/// Self-reported mood on the five-point check-in scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Bad,
    Awful,
}

impl Mood {
    /// Display label used in summaries and diary entries.
    pub fn label(self) -> &'static str {
        match self {
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Okay => "Okay",
            Self::Bad => "Bad",
            Self::Awful => "Awful",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A diary entry produced when a session completes. In-memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Unique id.
    pub id: String,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
    /// AI-generated (or fixed, for quick check-ins) summary text.
    pub summary: String,
    /// The conversation that produced this entry.
    pub conversation: Vec<Message>,
    /// Mood logged at session end.
    pub mood: Option<Mood>,
}

impl DiaryEntry {
    /// Create an entry stamped now.
    pub fn new(summary: impl Into<String>, conversation: Vec<Message>, mood: Option<Mood>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            summary: summary.into(),
            conversation,
            mood,
        }
    }
}

/// A calendar event as exchanged with the calendar collaborator and the
/// model. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    /// ISO-8601 start time.
    pub start_time: String,
    /// ISO-8601 end time.
    pub end_time: String,
}

impl CalendarEvent {
    /// Notification-dedup identity: title + start time.
    pub fn identity_key(&self) -> String {
        format!("{}{}", self.title, self.start_time)
    }
}

/// A time window flagged as likely stressful, either extracted by the
/// model from the calendar or added manually. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressHotspot {
    /// ISO-8601 start time.
    pub start_time: String,
    /// ISO-8601 end time.
    pub end_time: String,
    /// Short explanation of why the window is stressful.
    pub reason: String,
}

impl StressHotspot {
    /// Notification-dedup identity: reason + start time, prefixed so it
    /// can never collide with a calendar event key.
    pub fn identity_key(&self) -> String {
        format!("hotspot-{}{}", self.reason, self.start_time)
    }
}

/// Heart-rate-variability status reported by the wearable collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HrvStatus {
    Stable,
    Critical,
}

/// Parse an ISO-8601 timestamp leniently.
///
/// Accepts RFC 3339 strings and zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// forms (interpreted as UTC), since the model emits both. Returns `None`
/// for anything else; callers skip items they cannot place in time.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn placeholder_detection() {
        assert!(Message::ai("").is_empty_placeholder());
        assert!(Message::ai("  ").is_empty_placeholder());
        assert!(!Message::ai("hi").is_empty_placeholder());
        assert!(!Message::user("").is_empty_placeholder());
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(Message::user("a").id, Message::user("a").id);
    }

    #[test]
    fn event_identity_is_title_plus_start() {
        let event = CalendarEvent {
            title: "Review".into(),
            start_time: "2026-08-27T14:00:00Z".into(),
            end_time: "2026-08-27T15:00:00Z".into(),
        };
        assert_eq!(event.identity_key(), "Review2026-08-27T14:00:00Z");
    }

    #[test]
    fn hotspot_identity_cannot_collide_with_events() {
        let hotspot = StressHotspot {
            start_time: "2026-08-27T14:00:00Z".into(),
            end_time: "2026-08-27T15:00:00Z".into(),
            reason: "Back-to-back meetings".into(),
        };
        assert!(hotspot.identity_key().starts_with("hotspot-"));
    }

    #[test]
    fn identical_hotspots_share_identity() {
        let a = StressHotspot {
            start_time: "2026-08-27T14:00:00Z".into(),
            end_time: "2026-08-27T15:00:00Z".into(),
            reason: "Deadline".into(),
        };
        let b = a.clone();
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn timestamp_parsing_accepts_rfc3339_and_naive() {
        let rfc = parse_timestamp("2026-08-27T14:00:00+02:00");
        assert!(rfc.is_some_and(|t| t.hour() == 12));

        let naive = parse_timestamp("2024-09-25T14:00:00");
        assert!(naive.is_some_and(|t| t.hour() == 14));

        assert!(parse_timestamp("2024-09-25T14:00:00.250").is_some());
        assert!(parse_timestamp("not a time").is_none());
    }

    #[test]
    fn mood_serde_is_lowercase() {
        let json = serde_json::to_string(&Mood::Okay).unwrap_or_default();
        assert_eq!(json, "\"okay\"");
    }

    #[test]
    fn hrv_serde_matches_wire_shape() {
        let json = serde_json::to_string(&HrvStatus::Critical).unwrap_or_default();
        assert_eq!(json, "\"CRITICAL\"");
    }

    #[test]
    fn calendar_event_serde_is_camel_case() {
        let event = CalendarEvent {
            title: "Sync".into(),
            start_time: "2026-08-27T10:00:00Z".into(),
            end_time: "2026-08-27T10:30:00Z".into(),
        };
        let json = serde_json::to_string(&event).unwrap_or_default();
        assert!(json.contains("startTime"));
        assert!(json.contains("endTime"));
    }
}
