//! # Xi Core Library
//!
//! Scheduling engine for recurring habits. A habit reminds the user on an
//! interval that grows as they keep succeeding and snaps back after a miss.
//! The `xi` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Habits**: A habit plus its append-only event log; statistics are
//!   derived from the log, never stored
//! - **Policy**: Pure frequency-multiplier interval computation
//! - **Queue**: Overdue habits presented one at a time for confirmation
//! - **Reminders**: Adapter trait for whatever delivers notifications
//! - **Storage**: SQLite habit store and TOML configuration
//!
//! ## Key Components
//!
//! - [`HabitEngine`]: Composes storage, reminders and the overdue queue
//! - [`Habit`]: Habit state and scheduling transitions
//! - [`OverdueQueue`]: Single-slot confirmation queue
//! - [`Database`]: Habit and event persistence
//! - [`Config`]: Application configuration management

pub mod engine;
pub mod error;
pub mod habit;
pub mod policy;
pub mod queue;
pub mod reminder;
pub mod storage;

pub use engine::HabitEngine;
pub use error::{AdapterError, ConfigError, CoreError, StorageError, ValidationError};
pub use habit::{EventKind, Habit, HabitEvent, HabitId, HabitStats, HabitUpdate, NewHabit};
pub use policy::{Frequency, Response, SchedulingState};
pub use queue::{OverdueQueue, QueueOrder, QueueState};
pub use reminder::{
    NoopReminders, Outbox, PendingReminder, ReminderAction, ReminderAdapter, ReminderContent,
};
pub use storage::{ChangeSet, Config, Database, HabitStore, MemoryStore};
