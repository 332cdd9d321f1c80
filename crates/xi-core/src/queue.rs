//! Overdue-habit confirmation queue.
//!
//! Holds the habits waiting for the user to confirm whether they did them,
//! and a single confirmation slot. At most one habit occupies the slot.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> (scan) -> Presenting -> (resolve) -> Presenting | Idle
//! ```
//!
//! The queue stores ids only; habits are owned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::habit::{EventKind, Habit, HabitEvent, HabitId};

/// Order in which simultaneously overdue habits are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrder {
    /// Earliest `next_notification_at` first; ties keep input order.
    #[default]
    MostOverdue,
    /// Input order of the scanned habit list.
    Insertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Idle,
    Presenting,
}

#[derive(Debug, Clone, Default)]
pub struct OverdueQueue {
    order: QueueOrder,
    pending: VecDeque<HabitId>,
    confirming: Option<HabitId>,
}

impl OverdueQueue {
    pub fn new(order: QueueOrder) -> Self {
        Self {
            order,
            pending: VecDeque::new(),
            confirming: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> QueueState {
        if self.confirming.is_some() {
            QueueState::Presenting
        } else {
            QueueState::Idle
        }
    }

    /// Habit currently being confirmed.
    pub fn confirming(&self) -> Option<HabitId> {
        self.confirming
    }

    /// Habits waiting behind the confirmation slot, in presentation order.
    pub fn pending(&self) -> impl Iterator<Item = HabitId> + '_ {
        self.pending.iter().copied()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn contains(&self, id: HabitId) -> bool {
        self.confirming == Some(id) || self.pending.contains(&id)
    }

    pub fn order(&self) -> QueueOrder {
        self.order
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Queue every active habit whose reminder time has passed.
    ///
    /// An `OverduePrompt` event is appended to each overdue habit before the
    /// queue changes; the events are returned so the caller can persist them.
    /// With nothing overdue this is a no-op.
    pub fn scan(&mut self, habits: &mut [Habit], now: DateTime<Utc>) -> Vec<HabitEvent> {
        let mut overdue: Vec<usize> = habits
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_overdue(now))
            .map(|(i, _)| i)
            .collect();
        if overdue.is_empty() {
            return Vec::new();
        }

        let events = overdue
            .iter()
            .map(|&i| {
                let habit = &mut habits[i];
                let interval = habit.current_interval_secs();
                habit.append(EventKind::OverduePrompt, now, Some(interval))
            })
            .collect();

        if self.order == QueueOrder::MostOverdue {
            overdue.sort_by_key(|&i| habits[i].next_notification_at());
        }
        self.pending = overdue
            .into_iter()
            .map(|i| habits[i].id())
            .filter(|id| Some(*id) != self.confirming)
            .collect();
        tracing::debug!(pending = self.pending.len(), "overdue scan queued habits");

        self.present_next();
        events
    }

    /// Move the head of the queue into the confirmation slot if it is free.
    pub fn present_next(&mut self) -> Option<HabitId> {
        if self.confirming.is_some() {
            return None;
        }
        let next = self.pending.pop_front()?;
        self.confirming = Some(next);
        tracing::debug!(habit_id = %next, "presenting habit for confirmation");
        Some(next)
    }

    /// The user answered the presented habit; advance to the next one.
    pub fn resolve(&mut self) -> Option<HabitId> {
        if let Some(done) = self.confirming.take() {
            tracing::debug!(habit_id = %done, "confirmation resolved");
        }
        self.present_next()
    }

    /// Ask for a specific habit to be confirmed, e.g. when the user opens a
    /// reminder without choosing an action. Presents it now if the slot is
    /// free, otherwise puts it at the head of the queue.
    pub fn request(&mut self, id: HabitId) -> Option<HabitId> {
        if self.confirming == Some(id) {
            return None;
        }
        self.pending.retain(|p| *p != id);
        self.pending.push_front(id);
        self.present_next()
    }

    /// Forget a habit that was deleted or deactivated. If it was being
    /// confirmed, the next queued habit is presented.
    pub fn remove(&mut self, id: HabitId) -> Option<HabitId> {
        self.pending.retain(|p| *p != id);
        if self.confirming == Some(id) {
            self.confirming = None;
            return self.present_next();
        }
        None
    }

    /// Drop a queued (not presented) habit that was answered elsewhere.
    pub fn drop_pending(&mut self, id: HabitId) {
        self.pending.retain(|p| *p != id);
    }

    /// Drop every id for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(HabitId) -> bool) -> Option<HabitId> {
        self.pending.retain(|id| keep(*id));
        match self.confirming {
            Some(id) if !keep(id) => self.remove(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::habit::NewHabit;

    fn habit(name: &str, created: DateTime<Utc>) -> Habit {
        Habit::create(NewHabit::named(name), created).unwrap()
    }

    #[test]
    fn scan_with_nothing_overdue_is_noop() {
        let now = Utc::now();
        let mut habits = vec![habit("a", now)];
        let mut q = OverdueQueue::default();
        assert!(q.scan(&mut habits, now).is_empty());
        assert_eq!(q.state(), QueueState::Idle);
        assert!(habits[0].events().is_empty());
    }

    #[test]
    fn overdue_habit_is_presented_and_logged() {
        let now = Utc::now();
        let mut habits = vec![habit("Drink Water", now)];
        let mut q = OverdueQueue::default();

        let events = q.scan(&mut habits, now + Duration::seconds(86_500));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::OverduePrompt);
        assert_eq!(habits[0].total_reminders(), 1);
        assert_eq!(q.confirming(), Some(habits[0].id()));
        assert_eq!(q.state(), QueueState::Presenting);
    }

    #[test]
    fn inactive_habits_are_skipped() {
        let now = Utc::now();
        let mut habits = vec![habit("a", now)];
        habits[0].set_active(false);
        let mut q = OverdueQueue::default();
        assert!(q.scan(&mut habits, now + Duration::days(2)).is_empty());
        assert_eq!(q.confirming(), None);
    }

    #[test]
    fn most_overdue_first() {
        let now = Utc::now();
        let mut habits = vec![
            habit("recent", now - Duration::days(1)),
            habit("oldest", now - Duration::days(5)),
            habit("middle", now - Duration::days(3)),
        ];
        let ids: Vec<HabitId> = habits.iter().map(|h| h.id()).collect();
        let mut q = OverdueQueue::new(QueueOrder::MostOverdue);
        q.scan(&mut habits, now + Duration::hours(1));

        assert_eq!(q.confirming(), Some(ids[1]));
        assert_eq!(q.pending().collect::<Vec<_>>(), vec![ids[2], ids[0]]);
    }

    #[test]
    fn insertion_order_keeps_input_order() {
        let now = Utc::now();
        let mut habits = vec![
            habit("recent", now - Duration::days(1)),
            habit("oldest", now - Duration::days(5)),
        ];
        let ids: Vec<HabitId> = habits.iter().map(|h| h.id()).collect();
        let mut q = OverdueQueue::new(QueueOrder::Insertion);
        q.scan(&mut habits, now + Duration::hours(1));
        assert_eq!(q.confirming(), Some(ids[0]));
        assert_eq!(q.pending().collect::<Vec<_>>(), vec![ids[1]]);
    }

    #[test]
    fn repeated_scans_keep_single_slot() {
        let now = Utc::now();
        let mut habits: Vec<Habit> = (0..4)
            .map(|i| habit(&format!("h{i}"), now - Duration::days(2)))
            .collect();
        let mut q = OverdueQueue::default();
        let first = {
            q.scan(&mut habits, now);
            q.confirming()
        };
        for _ in 0..5 {
            q.scan(&mut habits, now);
            assert_eq!(q.confirming(), first);
            assert_eq!(q.pending_len(), 3);
            assert!(!q.pending().any(|id| Some(id) == first));
        }
    }

    #[test]
    fn resolve_drains_queue_then_idles() {
        let now = Utc::now();
        let mut habits = vec![habit("a", now - Duration::days(2)), habit("b", now - Duration::days(2))];
        let mut q = OverdueQueue::new(QueueOrder::Insertion);
        q.scan(&mut habits, now);

        assert_eq!(q.resolve(), Some(habits[1].id()));
        assert_eq!(q.resolve(), None);
        assert_eq!(q.state(), QueueState::Idle);
        assert_eq!(q.present_next(), None);
    }

    #[test]
    fn removing_presented_habit_advances() {
        let now = Utc::now();
        let mut habits = vec![habit("a", now - Duration::days(2)), habit("b", now - Duration::days(2))];
        let mut q = OverdueQueue::new(QueueOrder::Insertion);
        q.scan(&mut habits, now);

        assert_eq!(q.remove(habits[0].id()), Some(habits[1].id()));
        assert_eq!(q.confirming(), Some(habits[1].id()));
        assert_eq!(q.remove(HabitId::new()), None);
        assert_eq!(q.remove(habits[1].id()), None);
        assert_eq!(q.state(), QueueState::Idle);
    }

    #[test]
    fn request_never_displaces_current_confirmation() {
        let a = HabitId::new();
        let b = HabitId::new();
        let mut q = OverdueQueue::default();

        assert_eq!(q.request(a), Some(a));
        assert_eq!(q.request(b), None);
        assert_eq!(q.confirming(), Some(a));
        assert_eq!(q.pending().collect::<Vec<_>>(), vec![b]);
        assert_eq!(q.request(a), None);
        assert_eq!(q.resolve(), Some(b));
    }

    #[test]
    fn retain_clears_missing_ids() {
        let a = HabitId::new();
        let b = HabitId::new();
        let mut q = OverdueQueue::default();
        q.request(a);
        q.request(b);
        assert_eq!(q.retain(|id| id != a), Some(b));
        assert!(!q.contains(a));
    }
}
