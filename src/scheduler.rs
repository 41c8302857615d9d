//! Session timer and notification scheduling.
//!
//! The poll transition is pure: given a clock reading, the current
//! schedule, and the set of already-delivered identity keys, it returns
//! the new key set and the alerts that became due. The async runner wraps
//! it with a 10-second cadence plus an immediate wakeup whenever the
//! schedule changes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Notify, mpsc, oneshot};
use tracing::{info, warn};

use crate::backend::EmailService;
use crate::config::NotificationSettings;
use crate::model::{CalendarEvent, GUEST_EMAIL, StressHotspot, parse_timestamp};

/// Alert severity. Warnings also go out by email when an address is
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Warning,
}

/// A due notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub message: String,
    pub kind: AlertKind,
}

/// Identity keys already delivered. Items never re-fire for the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationState {
    delivered: HashSet<String>,
}

impl NotificationState {
    pub fn has_delivered(&self, key: &str) -> bool {
        self.delivered.contains(key)
    }
}

/// Compute the alerts due at `now`.
///
/// An item is due when its start time lies in `(now, now + lead]` and its
/// identity key has not been delivered. Items with unparseable start
/// times are skipped. The input state is untouched; the returned state
/// carries the newly delivered keys.
pub fn poll_due(
    now: DateTime<Utc>,
    lead: Duration,
    events: &[CalendarEvent],
    hotspots: &[StressHotspot],
    state: &NotificationState,
) -> (NotificationState, Vec<Alert>) {
    let mut next = state.clone();
    let mut alerts = Vec::new();

    let window_end = now + lead;
    let in_window = |start: DateTime<Utc>| start > now && start <= window_end;

    for event in events {
        let key = event.identity_key();
        if next.delivered.contains(&key) {
            continue;
        }
        let Some(start) = parse_timestamp(&event.start_time) else {
            continue;
        };
        if in_window(start) {
            let secs = (start - now).num_seconds();
            let minutes = secs / 60 + (secs % 60 > 0) as i64;
            next.delivered.insert(key);
            alerts.push(Alert {
                message: format!(
                    "Upcoming Event: \"{}\" starts in {minutes} minutes.",
                    event.title
                ),
                kind: AlertKind::Info,
            });
        }
    }

    for hotspot in hotspots {
        let key = hotspot.identity_key();
        if next.delivered.contains(&key) {
            continue;
        }
        let Some(start) = parse_timestamp(&hotspot.start_time) else {
            continue;
        };
        if in_window(start) {
            next.delivered.insert(key);
            alerts.push(Alert {
                message: format!(
                    "Stress Alert: \"{}\" is coming up. Consider a quick breathing exercise.",
                    hotspot.reason
                ),
                kind: AlertKind::Warning,
            });
        }
    }

    (next, alerts)
}

/// Whether a warning alert should also go out by email. The guest
/// identity has no real inbox.
pub fn should_email(kind: AlertKind, user_email: &str) -> bool {
    kind == AlertKind::Warning && !user_email.is_empty() && user_email != GUEST_EMAIL
}

#[derive(Debug, Default)]
struct Schedule {
    events: Vec<CalendarEvent>,
    hotspots: Vec<StressHotspot>,
}

/// Shared, mutable view of the day's schedule. Every mutation pokes the
/// runner so new items are considered immediately rather than on the
/// next tick.
#[derive(Clone, Default)]
pub struct ScheduleHandle {
    inner: Arc<Mutex<Schedule>>,
    changed: Arc<Notify>,
}

impl ScheduleHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_events(&self, events: Vec<CalendarEvent>) {
        if let Ok(mut schedule) = self.inner.lock() {
            schedule.events = events;
        }
        self.changed.notify_one();
    }

    pub fn add_hotspot(&self, hotspot: StressHotspot) {
        if let Ok(mut schedule) = self.inner.lock() {
            schedule.hotspots.push(hotspot);
        }
        self.changed.notify_one();
    }

    /// Remove a hotspot by identity key. Unknown keys are a no-op.
    pub fn remove_hotspot(&self, identity_key: &str) {
        if let Ok(mut schedule) = self.inner.lock() {
            schedule.hotspots.retain(|h| h.identity_key() != identity_key);
        }
        self.changed.notify_one();
    }

    pub fn hotspots(&self) -> Vec<StressHotspot> {
        self.inner
            .lock()
            .map(|s| s.hotspots.clone())
            .unwrap_or_default()
    }

    fn snapshot(&self) -> (Vec<CalendarEvent>, Vec<StressHotspot>) {
        self.inner
            .lock()
            .map(|s| (s.events.clone(), s.hotspots.clone()))
            .unwrap_or_default()
    }
}

/// Background task polling the schedule and delivering alerts.
pub struct NotificationRunner;

impl NotificationRunner {
    /// Spawn the poll loop. Alerts go to `alerts_tx`; warnings also go
    /// out through `email` unless the configured address is the guest.
    pub fn spawn(
        settings: NotificationSettings,
        schedule: ScheduleHandle,
        email: Arc<dyn EmailService>,
        alerts_tx: mpsc::UnboundedSender<Alert>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut state = NotificationState::default();
            let lead = Duration::minutes(settings.lead_minutes);
            let interval = StdDuration::from_secs(settings.poll_interval_secs);
            loop {
                let (events, hotspots) = schedule.snapshot();
                let (next, alerts) = poll_due(Utc::now(), lead, &events, &hotspots, &state);
                state = next;

                for alert in alerts {
                    info!(message = %alert.message, "notification due");
                    if should_email(alert.kind, &settings.user_email)
                        && let Err(e) = email
                            .send(&settings.user_email, "Stress Alert", &alert.message)
                            .await
                    {
                        warn!("alert email failed: {e}");
                    }
                    if alerts_tx.send(alert).is_err() {
                        return;
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = schedule.changed.notified() => {}
                }
            }
        })
    }
}

/// Countdown for the focused-session window.
pub struct SessionTimer {
    started: Instant,
    length: StdDuration,
}

impl SessionTimer {
    /// Start the countdown. The receiver fires once when time is up.
    pub fn start(length_secs: u32) -> (Self, oneshot::Receiver<()>) {
        let length = StdDuration::from_secs(u64::from(length_secs));
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(length).await;
            let _ = tx.send(());
        });
        (
            Self {
                started: Instant::now(),
                length,
            },
            rx,
        )
    }

    pub fn remaining(&self) -> StdDuration {
        self.length.saturating_sub(self.started.elapsed())
    }

    pub fn is_active(&self) -> bool {
        !self.remaining().is_zero()
    }

    /// Remaining time as `m:ss`. Partial seconds count as whole ones, so
    /// a freshly started timer shows the full session length.
    pub fn format_remaining(&self) -> String {
        let remaining = self.remaining();
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(title: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            title: title.into(),
            start_time: start.to_rfc3339(),
            end_time: (start + Duration::minutes(30)).to_rfc3339(),
        }
    }

    fn hotspot(reason: &str, start: DateTime<Utc>) -> StressHotspot {
        StressHotspot {
            start_time: start.to_rfc3339(),
            end_time: (start + Duration::minutes(30)).to_rfc3339(),
            reason: reason.into(),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-27T09:00:00Z")
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default()
    }

    #[test]
    fn only_items_inside_the_window_fire() {
        let now = now();
        let events = vec![
            event("Past", now - Duration::minutes(5)),
            event("Starting now", now),
            event("Soon", now + Duration::minutes(10)),
            event("Edge", now + Duration::minutes(15)),
            event("Later", now + Duration::minutes(16)),
        ];
        let (state, alerts) = poll_due(
            now,
            Duration::minutes(15),
            &events,
            &[],
            &NotificationState::default(),
        );

        let messages: Vec<_> = alerts.iter().map(|a| a.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Upcoming Event: \"Soon\" starts in 10 minutes.",
                "Upcoming Event: \"Edge\" starts in 15 minutes.",
            ]
        );
        assert!(state.has_delivered(&events[2].identity_key()));
        assert!(!state.has_delivered(&events[4].identity_key()));
    }

    #[test]
    fn partial_minutes_round_up() {
        let now = now();
        let events = vec![event("Sync", now + Duration::seconds(620))];
        let (_, alerts) = poll_due(
            now,
            Duration::minutes(15),
            &events,
            &[],
            &NotificationState::default(),
        );
        assert_eq!(
            alerts[0].message,
            "Upcoming Event: \"Sync\" starts in 11 minutes."
        );
    }

    #[test]
    fn delivered_items_never_refire() {
        let now = now();
        let events = vec![event("Standup", now + Duration::minutes(5))];
        let (state, first) = poll_due(
            now,
            Duration::minutes(15),
            &events,
            &[],
            &NotificationState::default(),
        );
        assert_eq!(first.len(), 1);

        // Same item, one minute later, still in window.
        let (_, second) = poll_due(
            now + Duration::minutes(1),
            Duration::minutes(15),
            &events,
            &[],
            &state,
        );
        assert!(second.is_empty());
    }

    #[test]
    fn hotspots_fire_as_warnings() {
        let now = now();
        let hotspots = vec![hotspot("Back-to-back meetings", now + Duration::minutes(8))];
        let (_, alerts) = poll_due(
            now,
            Duration::minutes(15),
            &[],
            &hotspots,
            &NotificationState::default(),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Warning);
        assert!(alerts[0].message.contains("Back-to-back meetings"));
        assert!(alerts[0].message.contains("breathing exercise"));
    }

    #[test]
    fn unparseable_start_times_are_skipped() {
        let now = now();
        let events = vec![CalendarEvent {
            title: "Broken".into(),
            start_time: "whenever".into(),
            end_time: "later".into(),
        }];
        let (state, alerts) = poll_due(
            now,
            Duration::minutes(15),
            &events,
            &[],
            &NotificationState::default(),
        );
        assert!(alerts.is_empty());
        assert!(!state.has_delivered(&events[0].identity_key()));
    }

    #[test]
    fn poll_does_not_mutate_its_input_state() {
        let now = now();
        let events = vec![event("Standup", now + Duration::minutes(5))];
        let initial = NotificationState::default();
        let (_, alerts) = poll_due(now, Duration::minutes(15), &events, &[], &initial);
        assert_eq!(alerts.len(), 1);
        assert!(!initial.has_delivered(&events[0].identity_key()));
    }

    #[test]
    fn guest_identity_gets_no_email() {
        assert!(!should_email(AlertKind::Warning, GUEST_EMAIL));
        assert!(!should_email(AlertKind::Warning, ""));
        assert!(!should_email(AlertKind::Info, "me@example.com"));
        assert!(should_email(AlertKind::Warning, "me@example.com"));
    }

    #[test]
    fn hotspot_removal_by_identity_key() {
        let schedule = ScheduleHandle::new();
        let h = hotspot("Deadline", now());
        schedule.add_hotspot(h.clone());
        assert_eq!(schedule.hotspots().len(), 1);

        schedule.remove_hotspot(&h.identity_key());
        assert!(schedule.hotspots().is_empty());

        // Unknown key is a no-op.
        schedule.remove_hotspot("nope");
    }

    #[tokio::test]
    async fn runner_delivers_new_hotspot_immediately() {
        let schedule = ScheduleHandle::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let settings = NotificationSettings {
            poll_interval_secs: 3600,
            ..NotificationSettings::default()
        };
        let handle = NotificationRunner::spawn(
            settings,
            schedule.clone(),
            Arc::new(crate::backend::MockBackend),
            tx,
        );

        schedule.add_hotspot(hotspot("Crunch", Utc::now() + Duration::minutes(5)));
        let alert = tokio::time::timeout(StdDuration::from_secs(2), rx.recv()).await;
        assert!(matches!(alert, Ok(Some(a)) if a.kind == AlertKind::Warning));
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn timer_counts_down_and_fires() {
        let (timer, fired) = SessionTimer::start(480);
        assert!(timer.is_active());
        assert_eq!(timer.format_remaining(), "8:00");

        tokio::time::advance(StdDuration::from_secs(481)).await;
        assert!(fired.await.is_ok());
    }
}
