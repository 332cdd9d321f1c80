//! Habit engine: the service that composes storage, reminders, and the
//! overdue queue.
//!
//! The engine is constructed once by whatever hosts the application and is
//! driven through `&mut self`; there is no global state. Every operation
//! takes an explicit `now` so hosts (and tests) control the clock.
//!
//! Storage writes for one operation are committed as a single change set.
//! Reminder scheduling happens after the commit and is fire-and-forget:
//! adapter failures are logged and never undo the habit update. A habit whose
//! reminder failed to post still shows up in the next [`HabitEngine::scan`].

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};
use crate::habit::{EventKind, Habit, HabitId, HabitStats, HabitUpdate, NewHabit};
use crate::policy::Response;
use crate::queue::OverdueQueue;
use crate::reminder::{self, ReminderAction, ReminderAdapter, ReminderContent};
use crate::storage::{ChangeSet, Config, HabitStore};

pub struct HabitEngine<S, R> {
    store: S,
    reminders: R,
    queue: OverdueQueue,
    config: Config,
}

impl<S: HabitStore, R: ReminderAdapter> HabitEngine<S, R> {
    pub fn new(store: S, reminders: R, config: Config) -> Self {
        Self {
            store,
            reminders,
            queue: OverdueQueue::new(config.queue.order),
            config,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn reminders(&self) -> &R {
        &self.reminders
    }

    pub fn queue(&self) -> &OverdueQueue {
        &self.queue
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn habits(&self) -> Result<Vec<Habit>> {
        Ok(self.store.fetch_all()?)
    }

    pub fn habit(&self, id: HabitId) -> Result<Habit> {
        self.store.fetch(id)?.ok_or(CoreError::NotFound(id))
    }

    pub fn stats(&self, id: HabitId) -> Result<HabitStats> {
        Ok(self.habit(id)?.stats())
    }

    /// Habit currently waiting for confirmation, if it still exists.
    pub fn confirming(&self) -> Result<Option<Habit>> {
        match self.queue.confirming() {
            Some(id) => Ok(self.store.fetch(id)?),
            None => Ok(None),
        }
    }

    // ── Habit lifecycle ──────────────────────────────────────────────

    pub fn create_habit(&mut self, mut new: NewHabit, now: DateTime<Utc>) -> Result<Habit> {
        if new.icon.is_none() {
            new.icon = Some(self.config.habits.default_icon.clone());
        }
        let habit = Habit::create(new, now)?;
        self.store.insert(&habit)?;
        tracing::info!(habit_id = %habit.id(), name = habit.name(), "habit created");

        self.schedule_reminder(&habit, now);
        Ok(habit)
    }

    /// Apply user edits. A frequency change reschedules the next reminder.
    pub fn update_habit(
        &mut self,
        id: HabitId,
        update: HabitUpdate,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let mut habit = self.habit(id)?;
        let renamed = update.name.is_some();
        let rescheduled = habit.apply(update, now)?;
        self.store.save(&ChangeSet::update(&habit))?;

        if rescheduled || renamed {
            self.schedule_reminder(&habit, now);
        }
        Ok(habit)
    }

    /// Soft (de)activation. Deactivated habits get no reminders and are
    /// never queued; reactivation restarts the reminder clock from `now`.
    pub fn set_active(&mut self, id: HabitId, active: bool, now: DateTime<Utc>) -> Result<Habit> {
        let mut habit = self.habit(id)?;
        if habit.is_active() == active {
            return Ok(habit);
        }
        habit.set_active(active);
        if active {
            habit.restart_schedule(now);
        }
        self.store.save(&ChangeSet::update(&habit))?;

        if active {
            self.schedule_reminder(&habit, now);
        } else {
            self.cancel_reminder(id);
            self.queue.remove(id);
        }
        tracing::info!(habit_id = %id, active, "habit activation changed");
        Ok(habit)
    }

    /// Delete a habit and its events, cancel its reminder and drop it from
    /// the queue. If it was being confirmed the next habit is presented.
    pub fn delete_habit(&mut self, id: HabitId) -> Result<()> {
        if !self.store.delete(id)? {
            return Err(CoreError::NotFound(id));
        }
        self.cancel_reminder(id);
        self.queue.remove(id);
        tracing::info!(habit_id = %id, "habit deleted");
        Ok(())
    }

    // ── Responses ────────────────────────────────────────────────────

    /// Record a response for any habit and schedule its next reminder.
    pub fn record_response(
        &mut self,
        id: HabitId,
        response: Response,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let mut habit = self.habit(id)?;
        let event = habit.record(response, now);
        self.store.save(&ChangeSet::response(&habit, event))?;

        if self.queue.confirming() != Some(id) {
            self.queue.drop_pending(id);
        }
        tracing::info!(
            habit_id = %id,
            ?response,
            multiplier = habit.interval_multiplier(),
            interval_secs = habit.current_interval_secs(),
            "response recorded"
        );

        self.schedule_reminder(&habit, now);
        Ok(habit)
    }

    /// Answer the habit in the confirmation slot and advance the queue.
    ///
    /// Returns `None` when nothing is being confirmed. If the presented
    /// habit was deleted in the meantime it is dropped and the next one is
    /// presented.
    pub fn answer(&mut self, response: Response, now: DateTime<Utc>) -> Result<Option<Habit>> {
        let Some(id) = self.queue.confirming() else {
            return Ok(None);
        };
        match self.record_response(id, response, now) {
            Ok(habit) => {
                self.queue.resolve();
                Ok(Some(habit))
            }
            Err(CoreError::NotFound(_)) => {
                tracing::debug!(habit_id = %id, "confirmed habit no longer exists");
                self.queue.remove(id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Clear the confirmation slot and present the next queued habit.
    pub fn resolve(&mut self) -> Option<HabitId> {
        self.queue.resolve()
    }

    /// Route an action delivered by the reminder platform.
    ///
    /// Success/Failure/Later record a response. Opening the reminder without
    /// choosing routes the habit to the confirmation queue instead.
    pub fn handle_action(
        &mut self,
        id: HabitId,
        action: ReminderAction,
        now: DateTime<Utc>,
    ) -> Result<Option<Habit>> {
        match action.response() {
            Some(response) => {
                let habit = self.record_response(id, response, now)?;
                if self.queue.confirming() == Some(id) {
                    self.queue.resolve();
                }
                Ok(Some(habit))
            }
            None => {
                self.habit(id)?;
                self.queue.request(id);
                Ok(None)
            }
        }
    }

    /// The platform reports it delivered a reminder.
    pub fn record_reminder_sent(&mut self, id: HabitId, now: DateTime<Utc>) -> Result<()> {
        let mut habit = self.habit(id)?;
        let interval = habit.current_interval_secs();
        let event = habit.append(EventKind::ReminderSent, now, Some(interval));
        self.store.save(&ChangeSet::events(vec![event]))?;
        Ok(())
    }

    // ── Overdue queue ────────────────────────────────────────────────

    /// Queue overdue habits and present the first. Call on app foreground
    /// and whenever the habit collection changes.
    ///
    /// The `OverduePrompt` events are committed before the queue changes; a
    /// storage failure leaves the queue untouched.
    pub fn scan(&mut self, now: DateTime<Utc>) -> Result<Option<HabitId>> {
        let mut habits = self.store.fetch_all()?;

        let mut next = self.queue.clone();
        next.retain(|id| habits.iter().any(|h| h.id() == id && h.is_active()));
        let events = next.scan(&mut habits, now);
        if !events.is_empty() {
            self.store.save(&ChangeSet::events(events))?;
        }
        self.queue = next;
        Ok(self.queue.confirming())
    }

    // ── Reminders ────────────────────────────────────────────────────

    /// Post a one-off test reminder `delay` from now. Returns false when
    /// reminders are disabled or not permitted.
    pub fn send_test_reminder(
        &mut self,
        id: HabitId,
        delay: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let habit = self.habit(id)?;
        let fire_at = reminder::test_fire_at(now, delay)?;
        if !self.reminders_allowed() {
            return Ok(false);
        }
        let content = ReminderContent::test_for_habit(&habit, &self.config.reminders.title);
        if let Err(e) = self.reminders.schedule(id, fire_at, now, content) {
            tracing::warn!(habit_id = %id, "test reminder failed: {e}");
            return Ok(false);
        }
        Ok(true)
    }

    pub fn cancel_all_reminders(&mut self) {
        if let Err(e) = self.reminders.cancel_all() {
            tracing::warn!("cancelling reminders failed: {e}");
        }
    }

    fn reminders_allowed(&self) -> bool {
        self.config.reminders.enabled && self.reminders.has_permission()
    }

    fn schedule_reminder(&mut self, habit: &Habit, now: DateTime<Utc>) {
        if !habit.is_active() {
            return;
        }
        if !self.reminders_allowed() {
            tracing::debug!(habit_id = %habit.id(), "reminders unavailable; relying on overdue scan");
            return;
        }
        let content = ReminderContent::for_habit(habit, &self.config.reminders.title);
        if let Err(e) = self
            .reminders
            .schedule(habit.id(), habit.next_notification_at(), now, content)
        {
            tracing::warn!(habit_id = %habit.id(), "scheduling reminder failed: {e}");
        }
    }

    fn cancel_reminder(&mut self, id: HabitId) {
        if let Err(e) = self.reminders.cancel(id) {
            tracing::warn!(habit_id = %id, "cancelling reminder failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdapterError, ValidationError};
    use crate::reminder::{Outbox, PendingReminder};
    use crate::storage::MemoryStore;

    fn engine() -> HabitEngine<MemoryStore, Outbox> {
        HabitEngine::new(MemoryStore::new(), Outbox::new(), Config::default())
    }

    #[test]
    fn create_schedules_first_reminder() {
        let mut engine = engine();
        let now = Utc::now();
        let habit = engine.create_habit(NewHabit::named("Walk"), now).unwrap();
        let reminder = engine.reminders().get(habit.id()).unwrap();
        assert_eq!(reminder.fire_at, now + Duration::seconds(86_400));
        assert_eq!(reminder.content.body, "Did you do your habit: Walk?");
    }

    #[test]
    fn disabled_reminders_skip_scheduling() {
        let mut config = Config::default();
        config.reminders.enabled = false;
        let mut engine = HabitEngine::new(MemoryStore::new(), Outbox::new(), config);
        engine.create_habit(NewHabit::named("Walk"), Utc::now()).unwrap();
        assert!(engine.reminders().is_empty());
    }

    #[test]
    fn response_reschedules_reminder() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        let later = now + Duration::days(1);
        let habit = engine.record_response(id, Response::Later, later).unwrap();
        assert_eq!(
            engine.reminders().get(id).unwrap().fire_at,
            habit.next_notification_at()
        );
        assert_eq!(engine.habit(id).unwrap().events().len(), 1);
    }

    #[test]
    fn unknown_habit_is_not_found() {
        let mut engine = engine();
        let id = HabitId::new();
        assert!(matches!(
            engine.record_response(id, Response::Success, Utc::now()),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(engine.delete_habit(id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn deactivation_cancels_and_reactivation_restarts() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();

        engine.set_active(id, false, now).unwrap();
        assert!(engine.reminders().get(id).is_none());
        assert_eq!(engine.scan(now + Duration::days(3)).unwrap(), None);

        let back = now + Duration::days(3);
        let habit = engine.set_active(id, true, back).unwrap();
        assert_eq!(habit.next_notification_at(), back + Duration::days(1));
        assert!(engine.reminders().get(id).is_some());
    }

    #[test]
    fn opened_action_requests_confirmation() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        let result = engine.handle_action(id, ReminderAction::Opened, now).unwrap();
        assert!(result.is_none());
        assert_eq!(engine.queue().confirming(), Some(id));
        assert!(engine.habit(id).unwrap().events().is_empty());

        let habit = engine
            .handle_action(id, ReminderAction::Success, now)
            .unwrap()
            .unwrap();
        assert_eq!(habit.consecutive_successes(), 1);
        assert_eq!(engine.queue().confirming(), None);
    }

    #[test]
    fn reminder_sent_is_logged() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        engine.record_reminder_sent(id, now).unwrap();
        let stats = engine.stats(id).unwrap();
        assert_eq!(stats.total_reminders, 1);
        assert_eq!(stats.total_responses, 0);
    }

    struct Broken;

    impl ReminderAdapter for Broken {
        fn has_permission(&self) -> bool {
            true
        }
        fn schedule(
            &mut self,
            habit_id: HabitId,
            _fire_at: DateTime<Utc>,
            _now: DateTime<Utc>,
            _content: ReminderContent,
        ) -> Result<(), AdapterError> {
            Err(AdapterError::ScheduleFailed {
                habit_id,
                message: "offline".into(),
            })
        }
        fn cancel(&mut self, _habit_id: HabitId) -> Result<(), AdapterError> {
            Err(AdapterError::CancelFailed("offline".into()))
        }
        fn cancel_all(&mut self) -> Result<(), AdapterError> {
            Err(AdapterError::CancelFailed("offline".into()))
        }
        fn pending(&self) -> Result<Vec<PendingReminder>, AdapterError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn adapter_failure_never_rolls_back_state() {
        let mut engine = HabitEngine::new(MemoryStore::new(), Broken, Config::default());
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        let habit = engine.record_response(id, Response::Success, now).unwrap();
        assert_eq!(habit.consecutive_successes(), 1);
        assert_eq!(engine.habit(id).unwrap().events().len(), 1);
        engine.delete_habit(id).unwrap();
        assert!(engine.habits().unwrap().is_empty());
    }

    #[test]
    fn oversized_test_reminder_delay_is_rejected() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        let before = engine.reminders().get(id).cloned();

        let result = engine.send_test_reminder(id, Duration::seconds(10_000_000_000_000), now);
        assert!(matches!(
            result,
            Err(CoreError::Validation(ValidationError::InvalidValue { .. }))
        ));
        assert_eq!(engine.reminders().get(id).cloned(), before);
    }

    #[test]
    fn test_reminder_uses_test_content() {
        let mut engine = engine();
        let now = Utc::now();
        let id = engine.create_habit(NewHabit::named("Walk"), now).unwrap().id();
        assert!(engine
            .send_test_reminder(id, Duration::seconds(5), now)
            .unwrap());
        let reminder = engine.reminders().get(id).unwrap();
        assert_eq!(reminder.fire_at, now + Duration::seconds(5));
        assert_eq!(reminder.content.title, "Xi Habit Check (TEST)");
    }
}
