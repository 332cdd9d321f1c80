//! Habit entity and its event log.
//!
//! A [`Habit`] owns its scheduling parameters and the full list of
//! [`HabitEvent`]s that happened to it. Statistics are derived from the
//! event log on every read (see [`stats`]); the legacy attempt counters are
//! kept for display only.

pub mod event;
pub mod stats;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::policy::{self, Frequency, Response, SchedulingState, MAX_INTERVAL_SECS};

pub use event::{EventKind, HabitEvent};
pub use stats::HabitStats;

/// Icon used when the user doesn't pick one.
pub const DEFAULT_ICON: &str = "✅";

/// Stable habit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(Uuid);

impl HabitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for HabitId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Input for creating a habit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
}

impl NewHabit {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }
}

/// User edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HabitUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub frequency: Option<Frequency>,
}

impl HabitUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.frequency.is_none()
    }
}

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// `now + interval_secs`, saturating at the latest representable instant.
fn after(now: DateTime<Utc>, interval_secs: u64) -> DateTime<Utc> {
    i64::try_from(interval_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn non_blank(icon: Option<String>) -> Option<String> {
    icon.filter(|icon| !icon.trim().is_empty())
}

/// A recurring habit and its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub(crate) id: HabitId,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) is_active: bool,
    pub(crate) icon: String,
    pub(crate) frequency: Frequency,

    pub(crate) current_interval_secs: u64,
    pub(crate) next_notification_at: DateTime<Utc>,
    pub(crate) consecutive_successes: u32,
    pub(crate) interval_multiplier: u32,

    // Display-only counters; statistics come from `events`.
    pub(crate) total_attempts: u32,
    pub(crate) successful_attempts: u32,
    pub(crate) last_checked_at: Option<DateTime<Utc>>,

    /// Event log in append order.
    #[serde(default)]
    pub(crate) events: Vec<HabitEvent>,
}

impl Habit {
    /// Create a habit with default scheduling: multiplier 1, first reminder
    /// one base period from `now`.
    pub fn create(new: NewHabit, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        let name = validate_name(&new.name)?;
        let icon = non_blank(new.icon).unwrap_or_else(|| DEFAULT_ICON.to_string());
        let interval = new.frequency.base_interval_secs();
        Ok(Self {
            id: HabitId::new(),
            name,
            description: new.description,
            created_at: now,
            is_active: true,
            icon,
            frequency: new.frequency,
            current_interval_secs: interval,
            next_notification_at: after(now, interval),
            consecutive_successes: 0,
            interval_multiplier: 1,
            total_attempts: 0,
            successful_attempts: 0,
            last_checked_at: None,
            events: Vec::new(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> HabitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn current_interval_secs(&self) -> u64 {
        self.current_interval_secs
    }

    pub fn next_notification_at(&self) -> DateTime<Utc> {
        self.next_notification_at
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn interval_multiplier(&self) -> u32 {
        self.interval_multiplier
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    pub fn successful_attempts(&self) -> u32 {
        self.successful_attempts
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at
    }

    /// Events in append order.
    pub fn events(&self) -> &[HabitEvent] {
        &self.events
    }

    pub fn scheduling_state(&self) -> SchedulingState {
        SchedulingState {
            interval_multiplier: self.interval_multiplier,
            consecutive_successes: self.consecutive_successes,
        }
    }

    /// `base_interval(frequency) * multiplier`.
    pub fn frequency_interval_secs(&self) -> u64 {
        policy::frequency_interval_secs(self.frequency, self.interval_multiplier)
    }

    /// Active and past its reminder time.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_notification_at < now
    }

    // ── Edits ────────────────────────────────────────────────────────

    pub fn rename(&mut self, name: &str) -> Result<(), ValidationError> {
        self.name = validate_name(name)?;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Blank icons are ignored.
    pub fn set_icon(&mut self, icon: impl Into<String>) {
        if let Some(icon) = non_blank(Some(icon.into())) {
            self.icon = icon;
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Switch frequency and reschedule from `now`, keeping the multiplier and
    /// streak. Appends no event.
    pub fn set_frequency(&mut self, frequency: Frequency, now: DateTime<Utc>) {
        self.frequency = frequency;
        self.reschedule(self.frequency_interval_secs(), now);
    }

    /// Apply a batch of edits. The name is the only fallible edit and is
    /// applied first, so a rejected update changes nothing.
    /// Returns true when the schedule was recomputed.
    pub fn apply(&mut self, update: HabitUpdate, now: DateTime<Utc>) -> Result<bool, ValidationError> {
        if let Some(name) = &update.name {
            self.rename(name)?;
        }
        if let Some(description) = update.description {
            self.set_description(description);
        }
        if let Some(icon) = update.icon {
            self.set_icon(icon);
        }
        match update.frequency {
            Some(frequency) if frequency != self.frequency => {
                self.set_frequency(frequency, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Restart the reminder clock from `now` using the current interval.
    pub fn restart_schedule(&mut self, now: DateTime<Utc>) {
        self.reschedule(self.current_interval_secs, now);
    }

    // ── Responses ────────────────────────────────────────────────────

    pub fn record_success(&mut self, now: DateTime<Utc>) -> HabitEvent {
        self.record(Response::Success, now)
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) -> HabitEvent {
        self.record(Response::Failure, now)
    }

    pub fn record_later(&mut self, now: DateTime<Utc>) -> HabitEvent {
        self.record(Response::Later, now)
    }

    /// Apply the interval policy for `response` and append exactly one event
    /// carrying the interval that governed the answered reminder.
    pub fn record(&mut self, response: Response, now: DateTime<Utc>) -> HabitEvent {
        let t = policy::transition(self.frequency, self.scheduling_state(), response);

        self.interval_multiplier = t.state.interval_multiplier;
        self.consecutive_successes = t.state.consecutive_successes;
        match response {
            Response::Success => {
                self.total_attempts = self.total_attempts.saturating_add(1);
                self.successful_attempts = self.successful_attempts.saturating_add(1);
                self.last_checked_at = Some(now);
            }
            Response::Failure => {
                self.total_attempts = self.total_attempts.saturating_add(1);
                self.last_checked_at = Some(now);
            }
            Response::Later => {}
        }
        self.reschedule(t.interval_secs, now);

        self.append(response.into(), now, Some(t.previous_interval_secs))
    }

    /// Append an event and return a copy for persistence.
    pub fn append(
        &mut self,
        kind: EventKind,
        now: DateTime<Utc>,
        interval_secs: Option<u64>,
    ) -> HabitEvent {
        let event = HabitEvent::new(self.id, kind, now, interval_secs);
        self.events.push(event.clone());
        event
    }

    fn reschedule(&mut self, interval_secs: u64, now: DateTime<Utc>) {
        self.current_interval_secs = interval_secs.clamp(1, MAX_INTERVAL_SECS);
        self.next_notification_at = after(now, self.current_interval_secs);
    }
}
