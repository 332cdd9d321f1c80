//! Append-only event log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::HabitId;
use crate::policy::Response;

/// What happened to a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ReminderSent,
    OverduePrompt,
    ResponseSuccess,
    ResponseFailure,
    ResponseLater,
}

impl EventKind {
    /// Storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ReminderSent => "reminder_sent",
            EventKind::OverduePrompt => "overdue_prompt",
            EventKind::ResponseSuccess => "response_success",
            EventKind::ResponseFailure => "response_failure",
            EventKind::ResponseLater => "response_later",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reminder_sent" => Some(EventKind::ReminderSent),
            "overdue_prompt" => Some(EventKind::OverduePrompt),
            "response_success" => Some(EventKind::ResponseSuccess),
            "response_failure" => Some(EventKind::ResponseFailure),
            "response_later" => Some(EventKind::ResponseLater),
            _ => None,
        }
    }

    pub fn is_reminder(self) -> bool {
        matches!(self, EventKind::ReminderSent | EventKind::OverduePrompt)
    }

    pub fn is_response(self) -> bool {
        matches!(
            self,
            EventKind::ResponseSuccess | EventKind::ResponseFailure | EventKind::ResponseLater
        )
    }
}

impl From<Response> for EventKind {
    fn from(response: Response) -> Self {
        match response {
            Response::Success => EventKind::ResponseSuccess,
            Response::Failure => EventKind::ResponseFailure,
            Response::Later => EventKind::ResponseLater,
        }
    }
}

/// One immutable fact in a habit's history.
///
/// Fields are private so an event can't be edited after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEvent {
    id: Uuid,
    habit_id: HabitId,
    timestamp: DateTime<Utc>,
    kind: EventKind,
    interval_secs: Option<u64>,
    note: Option<String>,
}

impl HabitEvent {
    pub fn new(
        habit_id: HabitId,
        kind: EventKind,
        timestamp: DateTime<Utc>,
        interval_secs: Option<u64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            habit_id,
            timestamp,
            kind,
            interval_secs,
            note: None,
        }
    }

    /// Rebuild an event read back from storage.
    pub fn restore(
        id: Uuid,
        habit_id: HabitId,
        timestamp: DateTime<Utc>,
        kind: EventKind,
        interval_secs: Option<u64>,
        note: Option<String>,
    ) -> Self {
        Self {
            id,
            habit_id,
            timestamp,
            kind,
            interval_secs,
            note,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn habit_id(&self) -> HabitId {
        self.habit_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Interval that was in effect when the event happened.
    pub fn interval_secs(&self) -> Option<u64> {
        self.interval_secs
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_reminder(&self) -> bool {
        self.kind.is_reminder()
    }

    pub fn is_response(&self) -> bool {
        self.kind.is_response()
    }

    pub fn is_success(&self) -> bool {
        self.kind == EventKind::ResponseSuccess
    }

    pub fn is_failure(&self) -> bool {
        self.kind == EventKind::ResponseFailure
    }

    pub fn is_later(&self) -> bool {
        self.kind == EventKind::ResponseLater
    }
}
