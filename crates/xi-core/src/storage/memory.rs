//! In-memory [`HabitStore`], for tests and hosts without durable storage.

use super::{ChangeSet, HabitStore};
use crate::error::StorageError;
use crate::habit::{Habit, HabitId};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    habits: Vec<Habit>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: HabitId) -> Option<usize> {
        self.habits.iter().position(|h| h.id == id)
    }

    fn missing(id: HabitId) -> StorageError {
        StorageError::QueryFailed(format!("habit {id} does not exist"))
    }
}

impl HabitStore for MemoryStore {
    fn insert(&mut self, habit: &Habit) -> Result<(), StorageError> {
        if self.position(habit.id).is_some() {
            return Err(StorageError::QueryFailed(format!(
                "habit {} already exists",
                habit.id
            )));
        }
        self.habits.push(habit.clone());
        Ok(())
    }

    fn delete(&mut self, id: HabitId) -> Result<bool, StorageError> {
        let before = self.habits.len();
        self.habits.retain(|h| h.id != id);
        Ok(self.habits.len() != before)
    }

    fn fetch_all(&self) -> Result<Vec<Habit>, StorageError> {
        Ok(self.habits.clone())
    }

    fn fetch(&self, id: HabitId) -> Result<Option<Habit>, StorageError> {
        Ok(self.position(id).map(|i| self.habits[i].clone()))
    }

    fn save(&mut self, changes: &ChangeSet) -> Result<(), StorageError> {
        // Check every reference before touching anything.
        let referenced = changes
            .habits
            .iter()
            .map(|h| h.id)
            .chain(changes.events.iter().map(|e| e.habit_id()));
        for id in referenced {
            if self.position(id).is_none() {
                return Err(Self::missing(id));
            }
        }

        for update in &changes.habits {
            if let Some(i) = self.position(update.id) {
                let events = std::mem::take(&mut self.habits[i].events);
                self.habits[i] = Habit {
                    events,
                    ..update.clone()
                };
            }
        }
        for event in &changes.events {
            if let Some(i) = self.position(event.habit_id()) {
                let habit = &mut self.habits[i];
                if !habit.events.iter().any(|e| e.id() == event.id()) {
                    habit.events.push(event.clone());
                }
            }
        }
        Ok(())
    }
}
