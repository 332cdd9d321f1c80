//! Statistics derived from a habit's event log.
//!
//! Nothing here is cached: every figure is recomputed from `Habit::events`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Habit, HabitEvent, HabitId};

/// Point-in-time summary of a habit's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitStats {
    pub habit_id: HabitId,
    /// 0.0 .. 100.0
    pub success_rate: f64,
    pub streak_count: u32,
    pub total_responses: u32,
    pub total_reminders: u32,
    pub successes: u32,
    pub failures: u32,
    pub laters: u32,
    pub last_response_at: Option<DateTime<Utc>>,
}

impl Habit {
    /// Events, most recent first. Events sharing a timestamp keep reverse
    /// append order.
    pub fn recent_events(&self) -> Vec<&HabitEvent> {
        let mut events: Vec<&HabitEvent> = self.events.iter().rev().collect();
        events.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        events
    }

    pub fn total_responses(&self) -> u32 {
        count(self.events.iter().filter(|e| e.is_response()))
    }

    pub fn total_reminders(&self) -> u32 {
        count(self.events.iter().filter(|e| e.is_reminder()))
    }

    /// Percentage of responses that were successes, or 0 with no responses.
    pub fn success_rate(&self) -> f64 {
        let responses = self.total_responses();
        if responses == 0 {
            return 0.0;
        }
        let successes = count(self.events.iter().filter(|e| e.is_success()));
        f64::from(successes) / f64::from(responses) * 100.0
    }

    /// Number of most recent responses that are all successes.
    pub fn streak_count(&self) -> u32 {
        count(
            self.recent_events()
                .into_iter()
                .filter(|e| e.is_response())
                .take_while(|e| e.is_success()),
        )
    }

    pub fn stats(&self) -> HabitStats {
        let responses = || self.events.iter().filter(|e| e.is_response());
        HabitStats {
            habit_id: self.id,
            success_rate: self.success_rate(),
            streak_count: self.streak_count(),
            total_responses: self.total_responses(),
            total_reminders: self.total_reminders(),
            successes: count(responses().filter(|e| e.is_success())),
            failures: count(responses().filter(|e| e.is_failure())),
            laters: count(responses().filter(|e| e.is_later())),
            last_response_at: responses().map(|e| e.timestamp()).max(),
        }
    }
}

fn count<'a>(events: impl Iterator<Item = &'a HabitEvent>) -> u32 {
    u32::try_from(events.count()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use proptest::prelude::*;

    use super::*;
    use crate::habit::{EventKind, NewHabit};
    use crate::policy::Response;

    fn habit() -> Habit {
        Habit::create(NewHabit::named("Stretch"), Utc::now()).unwrap()
    }

    #[test]
    fn empty_log() {
        let h = habit();
        assert_eq!(h.success_rate(), 0.0);
        assert_eq!(h.streak_count(), 0);
        assert_eq!(h.total_responses(), 0);
        assert_eq!(h.total_reminders(), 0);
        assert!(h.recent_events().is_empty());
    }

    #[test]
    fn reminders_do_not_count_as_responses() {
        let mut h = habit();
        let now = Utc::now();
        h.append(EventKind::ReminderSent, now, None);
        h.append(EventKind::OverduePrompt, now, None);
        assert_eq!(h.total_reminders(), 2);
        assert_eq!(h.total_responses(), 0);
        assert_eq!(h.success_rate(), 0.0);
    }

    #[test]
    fn success_rate_uses_all_responses() {
        let mut h = habit();
        let t0 = Utc::now();
        h.record_success(t0);
        h.record_success(t0 + Duration::seconds(1));
        h.record_failure(t0 + Duration::seconds(2));
        h.record_later(t0 + Duration::seconds(3));
        assert_eq!(h.success_rate(), 50.0);
    }

    #[test]
    fn streak_counts_from_most_recent_response() {
        let mut h = habit();
        let t0 = Utc::now();
        h.record_failure(t0);
        h.record_success(t0 + Duration::seconds(1));
        h.append(EventKind::OverduePrompt, t0 + Duration::seconds(2), None);
        h.record_success(t0 + Duration::seconds(3));
        assert_eq!(h.streak_count(), 2);

        h.record_later(t0 + Duration::seconds(4));
        assert_eq!(h.streak_count(), 0);
    }

    #[test]
    fn recent_events_newest_first() {
        let mut h = habit();
        let t0 = Utc::now();
        h.record_success(t0 + Duration::seconds(10));
        h.append(EventKind::ReminderSent, t0, None);
        let kinds: Vec<EventKind> = h.recent_events().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::ResponseSuccess, EventKind::ReminderSent]);
    }

    #[test]
    fn stats_snapshot_breakdown() {
        let mut h = habit();
        let t0 = Utc::now();
        h.record_success(t0);
        h.record_failure(t0 + Duration::seconds(1));
        h.record_later(t0 + Duration::seconds(2));
        h.append(EventKind::OverduePrompt, t0 + Duration::seconds(3), None);

        let s = h.stats();
        assert_eq!(s.successes, 1);
        assert_eq!(s.failures, 1);
        assert_eq!(s.laters, 1);
        assert_eq!(s.total_reminders, 1);
        assert_eq!(s.last_response_at, Some(t0 + Duration::seconds(2)));
    }

    fn any_response() -> impl Strategy<Value = Response> {
        prop_oneof![
            Just(Response::Success),
            Just(Response::Failure),
            Just(Response::Later)
        ]
    }

    proptest! {
        #[test]
        fn success_rate_is_bounded(responses in proptest::collection::vec(any_response(), 0..40)) {
            let mut h = habit();
            let t0 = Utc::now();
            for (i, r) in responses.iter().enumerate() {
                h.record(*r, t0 + Duration::seconds(i as i64));
            }
            let rate = h.success_rate();
            prop_assert!((0.0..=100.0).contains(&rate));
            prop_assert_eq!(rate == 0.0, !responses.contains(&Response::Success));
        }

        #[test]
        fn streak_is_zero_after_non_success(responses in proptest::collection::vec(any_response(), 1..40)) {
            let mut h = habit();
            let t0 = Utc::now();
            for (i, r) in responses.iter().enumerate() {
                h.record(*r, t0 + Duration::seconds(i as i64));
            }
            if responses.last() != Some(&Response::Success) {
                prop_assert_eq!(h.streak_count(), 0);
            } else {
                prop_assert!(h.streak_count() >= 1);
            }
        }
    }
}
