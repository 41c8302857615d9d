//! External collaborator seams: calendar, wearable, emergency contact,
//! and email. Production deployments implement these against real
//! services; [`MockBackend`] ships for demos and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CompanionError, Result};
use crate::model::{CalendarEvent, HrvStatus};

/// Outcome of a state-changing collaborator action, echoed back to the
/// model as the tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub success: bool,
    pub message: String,
}

impl ActionReceipt {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Read and write access to the user's calendar.
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list_events(&self) -> Result<Vec<CalendarEvent>>;
    async fn add_event(
        &self,
        title: &str,
        start: &str,
        end: &str,
        description: Option<&str>,
    ) -> Result<ActionReceipt>;
}

/// Read access to the user's wearable.
#[async_trait]
pub trait WearableService: Send + Sync {
    async fn hrv_status(&self) -> Result<HrvStatus>;
}

/// Channel to the user's registered doctor.
#[async_trait]
pub trait EmergencyService: Send + Sync {
    async fn notify(&self, summary: &str) -> Result<ActionReceipt>;
}

/// Outbound email for stress alerts.
#[async_trait]
pub trait EmailService: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// The full set of collaborators a session needs.
#[derive(Clone)]
pub struct Collaborators {
    pub calendar: Arc<dyn CalendarService>,
    pub wearable: Arc<dyn WearableService>,
    pub emergency: Arc<dyn EmergencyService>,
    pub email: Arc<dyn EmailService>,
}

impl Collaborators {
    /// All collaborators backed by the in-process mock.
    pub fn mock() -> Self {
        let backend = Arc::new(MockBackend);
        Self {
            calendar: backend.clone(),
            wearable: backend.clone(),
            emergency: backend.clone(),
            email: backend,
        }
    }
}

/// In-process collaborator used for demos and tests. The calendar is a
/// plausible day anchored to "now"; HRV is occasionally critical so the
/// escalation path gets exercised.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

#[async_trait]
impl CalendarService for MockBackend {
    async fn list_events(&self) -> Result<Vec<CalendarEvent>> {
        let now = Utc::now();
        let iso = |offset_min: i64| {
            (now + Duration::minutes(offset_min))
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        };
        Ok(vec![
            CalendarEvent {
                title: "Team Standup".into(),
                start_time: iso(5),
                end_time: iso(35),
            },
            CalendarEvent {
                title: "Project Deadline Review".into(),
                start_time: iso(120),
                end_time: iso(180),
            },
            CalendarEvent {
                title: "1:1 with Manager".into(),
                start_time: iso(180),
                end_time: iso(210),
            },
        ])
    }

    async fn add_event(
        &self,
        title: &str,
        start: &str,
        end: &str,
        description: Option<&str>,
    ) -> Result<ActionReceipt> {
        if title.trim().is_empty() {
            return Err(CompanionError::Service("event title cannot be empty".into()));
        }
        info!(%title, %start, %end, description = description.unwrap_or(""), "mock calendar event added");
        Ok(ActionReceipt::ok(format!(
            "Event \"{title}\" added to your calendar."
        )))
    }
}

#[async_trait]
impl WearableService for MockBackend {
    async fn hrv_status(&self) -> Result<HrvStatus> {
        // 30% critical keeps the escalation path visible in demos.
        let critical = rand::thread_rng().gen_bool(0.3);
        Ok(if critical {
            HrvStatus::Critical
        } else {
            HrvStatus::Stable
        })
    }
}

#[async_trait]
impl EmergencyService for MockBackend {
    async fn notify(&self, summary: &str) -> Result<ActionReceipt> {
        info!(%summary, "mock doctor notification");
        Ok(ActionReceipt::ok(format!(
            "Your doctor has been notified. Summary: {summary}"
        )))
    }
}

#[async_trait]
impl EmailService for MockBackend {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(%to, %subject, body_len = body.len(), "mock email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_calendar_lists_a_plausible_day() {
        let events = match MockBackend.list_events().await {
            Ok(e) => e,
            Err(e) => unreachable!("mock failed: {e}"),
        };
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| crate::model::parse_timestamp(&e.start_time).is_some()));
    }

    #[tokio::test]
    async fn add_event_echoes_title_in_receipt() {
        let receipt = MockBackend
            .add_event(
                "Breathing break",
                "2026-08-27T10:00:00Z",
                "2026-08-27T10:10:00Z",
                Some("five slow breaths"),
            )
            .await;
        assert!(receipt.is_ok_and(|r| r.success && r.message.contains("Breathing break")));
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let receipt = MockBackend.add_event("  ", "a", "b", None).await;
        assert!(matches!(receipt, Err(CompanionError::Service(_))));
    }
}
