mod config;
pub mod database;
pub mod memory;
pub mod migrations;

pub use config::{Config, HabitsConfig, QueueConfig, RemindersConfig};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::error::StorageError;
use crate::habit::{Habit, HabitEvent, HabitId};

/// Returns the Xi data directory, creating it if needed.
///
/// `XI_DATA_DIR` overrides the location. Otherwise `~/.config/xi`, or
/// `~/.config/xi-dev` when `XI_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("XI_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("XI_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("xi-dev")
            } else {
                base_dir.join("xi")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Pending writes committed together by [`HabitStore::save`].
///
/// `habits` carries updated scheduling/attribute fields (their event lists are
/// ignored); `events` are new log entries to append.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub habits: Vec<Habit>,
    pub events: Vec<HabitEvent>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update `habit` and append `event` in one commit.
    pub fn response(habit: &Habit, event: HabitEvent) -> Self {
        Self {
            habits: vec![habit.clone()],
            events: vec![event],
        }
    }

    pub fn update(habit: &Habit) -> Self {
        Self {
            habits: vec![habit.clone()],
            events: Vec::new(),
        }
    }

    pub fn events(events: Vec<HabitEvent>) -> Self {
        Self {
            habits: Vec::new(),
            events,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.habits.is_empty() && self.events.is_empty()
    }
}

/// Durable home for habits and their event logs.
pub trait HabitStore {
    /// Insert a new habit together with any events it already carries.
    fn insert(&mut self, habit: &Habit) -> Result<(), StorageError>;

    /// Delete a habit and all of its events. Returns false if it didn't exist.
    fn delete(&mut self, id: HabitId) -> Result<bool, StorageError>;

    /// Every habit with its events loaded, oldest habit first.
    fn fetch_all(&self) -> Result<Vec<Habit>, StorageError>;

    fn fetch(&self, id: HabitId) -> Result<Option<Habit>, StorageError>;

    /// Commit a change set atomically: either everything is written or
    /// nothing is.
    fn save(&mut self, changes: &ChangeSet) -> Result<(), StorageError>;
}
