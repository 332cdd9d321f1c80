//! Reminder delivery contract.
//!
//! The platform notification mechanism lives outside this crate. The engine
//! talks to it through [`ReminderAdapter`] and treats every call as
//! fire-and-forget: failures are logged, never propagated into habit state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{AdapterError, ValidationError};
use crate::habit::{Habit, HabitId};
use crate::policy::{Response, MAX_INTERVAL_SECS};

pub const DEFAULT_TITLE: &str = "Xi Habit Check";
pub const CATEGORY: &str = "HABIT_CHECK";

/// What a reminder says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderContent {
    pub title: String,
    pub body: String,
    pub category: String,
}

impl ReminderContent {
    pub fn for_habit(habit: &Habit, title: &str) -> Self {
        Self {
            title: title.to_string(),
            body: format!("Did you do your habit: {}?", habit.name()),
            category: CATEGORY.to_string(),
        }
    }

    /// Manually triggered reminder used to check delivery end to end.
    pub fn test_for_habit(habit: &Habit, title: &str) -> Self {
        Self {
            title: format!("{title} (TEST)"),
            body: format!(
                "Did you do your habit: {}? This is a test notification.",
                habit.name()
            ),
            category: CATEGORY.to_string(),
        }
    }
}

/// A reminder waiting to fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingReminder {
    pub habit_id: HabitId,
    pub fire_at: DateTime<Utc>,
    pub content: ReminderContent,
}

/// Action the user took on a delivered reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderAction {
    Success,
    Failure,
    Later,
    /// Tapped the reminder itself without picking an action.
    Opened,
}

impl ReminderAction {
    pub const YES: &'static str = "YES_ACTION";
    pub const NO: &'static str = "NO_ACTION";
    pub const LATER: &'static str = "LATER_ACTION";

    /// Map a platform action identifier. Anything unrecognised is treated as
    /// the default tap.
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier {
            Self::YES => ReminderAction::Success,
            Self::NO => ReminderAction::Failure,
            Self::LATER => ReminderAction::Later,
            _ => ReminderAction::Opened,
        }
    }

    pub fn response(self) -> Option<Response> {
        match self {
            ReminderAction::Success => Some(Response::Success),
            ReminderAction::Failure => Some(Response::Failure),
            ReminderAction::Later => Some(Response::Later),
            ReminderAction::Opened => None,
        }
    }
}

impl FromStr for ReminderAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "success" => ReminderAction::Success,
            "failure" => ReminderAction::Failure,
            "later" => ReminderAction::Later,
            _ => Self::from_identifier(s),
        })
    }
}

/// Platform notification collaborator.
pub trait ReminderAdapter {
    /// Whether the user granted reminder permission. Without it scheduling
    /// silently does nothing.
    fn has_permission(&self) -> bool;

    /// Post a reminder for `habit_id` at `fire_at`, replacing any earlier one.
    /// Implementations do nothing when `fire_at <= now`.
    fn schedule(
        &mut self,
        habit_id: HabitId,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
        content: ReminderContent,
    ) -> Result<(), AdapterError>;

    fn cancel(&mut self, habit_id: HabitId) -> Result<(), AdapterError>;

    fn cancel_all(&mut self) -> Result<(), AdapterError>;

    /// Reminders that have not fired yet, soonest first.
    fn pending(&self) -> Result<Vec<PendingReminder>, AdapterError>;
}

/// Adapter for hosts without reminder permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReminders;

impl ReminderAdapter for NoopReminders {
    fn has_permission(&self) -> bool {
        false
    }

    fn schedule(
        &mut self,
        _habit_id: HabitId,
        _fire_at: DateTime<Utc>,
        _now: DateTime<Utc>,
        _content: ReminderContent,
    ) -> Result<(), AdapterError> {
        Ok(())
    }

    fn cancel(&mut self, _habit_id: HabitId) -> Result<(), AdapterError> {
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingReminder>, AdapterError> {
        Ok(Vec::new())
    }
}

/// In-memory outbox of scheduled reminders, one per habit.
#[derive(Debug, Default, Clone)]
pub struct Outbox {
    reminders: BTreeMap<HabitId, PendingReminder>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, habit_id: HabitId) -> Option<&PendingReminder> {
        self.reminders.get(&habit_id)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }
}

impl ReminderAdapter for Outbox {
    fn has_permission(&self) -> bool {
        true
    }

    fn schedule(
        &mut self,
        habit_id: HabitId,
        fire_at: DateTime<Utc>,
        now: DateTime<Utc>,
        content: ReminderContent,
    ) -> Result<(), AdapterError> {
        self.reminders.remove(&habit_id);
        if fire_at <= now {
            return Ok(());
        }
        self.reminders.insert(
            habit_id,
            PendingReminder {
                habit_id,
                fire_at,
                content,
            },
        );
        Ok(())
    }

    fn cancel(&mut self, habit_id: HabitId) -> Result<(), AdapterError> {
        self.reminders.remove(&habit_id);
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), AdapterError> {
        self.reminders.clear();
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingReminder>, AdapterError> {
        let mut pending: Vec<PendingReminder> = self.reminders.values().cloned().collect();
        pending.sort_by_key(|r| r.fire_at);
        Ok(pending)
    }
}

/// Fire time for a test reminder `delay` from `now`.
///
/// Delays under a second are raised to one; delays past the longest habit
/// interval are rejected.
pub fn test_fire_at(now: DateTime<Utc>, delay: Duration) -> Result<DateTime<Utc>, ValidationError> {
    let out_of_range = || ValidationError::InvalidValue {
        field: "delay".into(),
        message: format!("must be at most {MAX_INTERVAL_SECS} seconds"),
    };
    let too_long = u64::try_from(delay.num_seconds()).is_ok_and(|secs| secs > MAX_INTERVAL_SECS);
    if too_long {
        return Err(out_of_range());
    }
    now.checked_add_signed(delay.max(Duration::seconds(1)))
        .ok_or_else(out_of_range)
}
