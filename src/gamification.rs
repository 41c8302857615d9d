//! Gamification ledger: points, streaks, and badge unlocks.
//!
//! [`GamificationState::record_session`] is a pure transition so the same
//! inputs always yield the same ledger, regardless of how many UI layers
//! observe it.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Points awarded per completed session or quick check-in.
pub const POINTS_PER_SESSION: u32 = 10;

/// How a badge is earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Total points at or above this value.
    Points(u32),
    /// Current streak at or above this many days.
    Streak(u32),
}

/// A badge in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
}

/// The badge catalog.
pub const BADGES: &[Badge] = &[
    Badge {
        id: "first_step",
        name: "First Step",
        description: "Complete your first session.",
        requirement: Requirement::Points(10),
    },
    Badge {
        id: "reflective_mind",
        name: "Reflective Mind",
        description: "Earn 50 points.",
        requirement: Requirement::Points(50),
    },
    Badge {
        id: "journaling_pro",
        name: "Journaling Pro",
        description: "Earn 100 points.",
        requirement: Requirement::Points(100),
    },
    Badge {
        id: "consistent_checkin",
        name: "Consistent",
        description: "Check in 3 days in a row.",
        requirement: Requirement::Streak(3),
    },
    Badge {
        id: "resilience_builder",
        name: "Resilience Builder",
        description: "Check in 7 days in a row.",
        requirement: Requirement::Streak(7),
    },
];

/// The user's ledger. Badges are ids into [`BADGES`]; a `BTreeSet` keeps
/// serialization order stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationState {
    pub points: u32,
    pub streak: u32,
    pub badges: BTreeSet<String>,
    pub last_check_in: Option<NaiveDate>,
}

impl GamificationState {
    /// Apply one completed session dated `today`.
    ///
    /// Points always increase. The streak extends only from exactly
    /// yesterday, restarts from any older (or absent) check-in, and is
    /// untouched by a second session on the same day. Badges unlock in
    /// one pass over the catalog and are never revoked.
    pub fn record_session(&self, today: NaiveDate) -> Self {
        let points = self.points + POINTS_PER_SESSION;
        let streak = match self.last_check_in {
            Some(last) if last == today => self.streak,
            Some(last) if Some(last) == today.pred_opt() => self.streak + 1,
            _ => 1,
        };

        let mut badges = self.badges.clone();
        for badge in BADGES {
            let earned = match badge.requirement {
                Requirement::Points(needed) => points >= needed,
                Requirement::Streak(needed) => streak >= needed,
            };
            if earned {
                badges.insert(badge.id.to_string());
            }
        }

        Self {
            points,
            streak,
            badges,
            last_check_in: Some(today),
        }
    }

    /// Badges earned, resolved against the catalog.
    pub fn earned_badges(&self) -> Vec<&'static Badge> {
        BADGES
            .iter()
            .filter(|b| self.badges.contains(b.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap_or_default()
    }

    #[test]
    fn first_session_starts_the_ledger() {
        let state = GamificationState::default().record_session(day(1));
        assert_eq!(state.points, 10);
        assert_eq!(state.streak, 1);
        assert!(state.badges.contains("first_step"));
        assert_eq!(state.last_check_in, Some(day(1)));
    }

    #[test]
    fn consecutive_days_extend_the_streak() {
        let mut state = GamificationState::default();
        for d in 1..=3 {
            state = state.record_session(day(d));
        }
        assert_eq!(state.streak, 3);
        assert!(state.badges.contains("consistent_checkin"));
    }

    #[test]
    fn same_day_session_adds_points_but_not_streak() {
        let state = GamificationState::default().record_session(day(1));
        let again = state.record_session(day(1));
        assert_eq!(again.points, 20);
        assert_eq!(again.streak, 1);
    }

    #[test]
    fn a_gap_resets_the_streak_to_one() {
        let mut state = GamificationState::default();
        state = state.record_session(day(1));
        state = state.record_session(day(2));
        let after_gap = state.record_session(day(5));
        assert_eq!(after_gap.streak, 1);
        // Points survive the reset.
        assert_eq!(after_gap.points, 30);
    }

    #[test]
    fn badges_are_never_revoked() {
        let mut state = GamificationState::default();
        for d in 1..=3 {
            state = state.record_session(day(d));
        }
        assert!(state.badges.contains("consistent_checkin"));
        let after_gap = state.record_session(day(10));
        assert_eq!(after_gap.streak, 1);
        assert!(after_gap.badges.contains("consistent_checkin"));
    }

    #[test]
    fn point_badges_unlock_at_thresholds() {
        let mut state = GamificationState::default();
        for i in 0..10 {
            state = state.record_session(day(1 + i));
        }
        assert_eq!(state.points, 100);
        assert!(state.badges.contains("reflective_mind"));
        assert!(state.badges.contains("journaling_pro"));
        assert!(state.badges.contains("resilience_builder"));
    }

    #[test]
    fn transition_is_pure() {
        let state = GamificationState::default().record_session(day(1));
        let a = state.record_session(day(2));
        let b = state.record_session(day(2));
        assert_eq!(a, b);
        // Original is untouched.
        assert_eq!(state.points, 10);
    }
}
