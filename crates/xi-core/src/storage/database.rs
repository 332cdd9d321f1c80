//! SQLite-based habit storage.
//!
//! Provides persistent storage for:
//! - Habits and their scheduling state
//! - The append-only habit event log (cascades with its habit)
//! - A reminder outbox, so the CLI can act as a [`ReminderAdapter`]

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{data_dir, migrations, ChangeSet, HabitStore};
use crate::error::{AdapterError, StorageError};
use crate::habit::{EventKind, Habit, HabitEvent, HabitId};
use crate::policy::Frequency;
use crate::reminder::{PendingReminder, ReminderAdapter, ReminderContent};

const HABIT_COLUMNS: &str = "id, name, description, created_at, is_active, icon, frequency,
     current_interval_secs, next_notification_at, consecutive_successes,
     interval_multiplier, total_attempts, successful_attempts, last_checked_at";

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(StorageError::Corrupt { message }),
    )
}

fn parse_datetime(row: &Row, index: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(index, format!("bad timestamp '{raw}': {e}")))
}

fn parse_optional_datetime(row: &Row, index: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    match row.get::<_, Option<String>>(index)? {
        Some(_) => parse_datetime(row, index).map(Some),
        None => Ok(None),
    }
}

fn parse_uuid(row: &Row, index: usize) -> Result<Uuid, rusqlite::Error> {
    let raw: String = row.get(index)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(index, format!("bad id '{raw}': {e}")))
}

/// Build a Habit (without events) from a database row
fn row_to_habit(row: &Row) -> Result<Habit, rusqlite::Error> {
    let frequency_str: String = row.get(6)?;
    let frequency = frequency_str
        .parse::<Frequency>()
        .map_err(|e| conversion_error(6, e.to_string()))?;

    Ok(Habit {
        id: HabitId::from_uuid(parse_uuid(row, 0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_datetime(row, 3)?,
        is_active: row.get(4)?,
        icon: row.get(5)?,
        frequency,
        current_interval_secs: row.get::<_, u64>(7)?.max(1),
        next_notification_at: parse_datetime(row, 8)?,
        consecutive_successes: row.get(9)?,
        interval_multiplier: row.get::<_, u32>(10)?.max(1),
        total_attempts: row.get(11)?,
        successful_attempts: row.get(12)?,
        last_checked_at: parse_optional_datetime(row, 13)?,
        events: Vec::new(),
    })
}

/// Build a HabitEvent from a database row
fn row_to_event(row: &Row) -> Result<HabitEvent, rusqlite::Error> {
    let kind_str: String = row.get(3)?;
    let kind = EventKind::parse(&kind_str)
        .ok_or_else(|| conversion_error(3, format!("unknown event kind '{kind_str}'")))?;

    Ok(HabitEvent::restore(
        parse_uuid(row, 0)?,
        HabitId::from_uuid(parse_uuid(row, 1)?),
        parse_datetime(row, 2)?,
        kind,
        row.get(4)?,
        row.get(5)?,
    ))
}

/// Unwrap a row-mapping failure back into the storage error it carries.
fn unwrap_row_error(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
            match source.downcast::<StorageError>() {
                Ok(inner) => *inner,
                Err(other) => StorageError::Corrupt {
                    message: other.to_string(),
                },
            }
        }
        other => other.into(),
    }
}

/// SQLite database for habit storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/xi.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> crate::error::Result<Self> {
        let path = data_dir()?.join("xi.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn).map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn load_events(&self, habit_id: HabitId) -> Result<Vec<HabitEvent>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, habit_id, timestamp, kind, interval_secs, note
             FROM habit_events
             WHERE habit_id = ?1
             ORDER BY rowid",
        )?;
        let events = stmt
            .query_map(params![habit_id.to_string()], row_to_event)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;
        Ok(events)
    }

    fn insert_event(conn: &Connection, event: &HabitEvent) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT OR IGNORE INTO habit_events (id, habit_id, timestamp, kind, interval_secs, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id().to_string(),
                event.habit_id().to_string(),
                event.timestamp().to_rfc3339(),
                event.kind().as_str(),
                event.interval_secs(),
                event.note(),
            ],
        )?;
        Ok(())
    }

    fn update_habit(conn: &Connection, habit: &Habit) -> Result<(), rusqlite::Error> {
        let changed = conn.execute(
            "UPDATE habits SET
                name = ?2, description = ?3, is_active = ?4, icon = ?5, frequency = ?6,
                current_interval_secs = ?7, next_notification_at = ?8,
                consecutive_successes = ?9, interval_multiplier = ?10,
                total_attempts = ?11, successful_attempts = ?12, last_checked_at = ?13
             WHERE id = ?1",
            params![
                habit.id.to_string(),
                habit.name,
                habit.description,
                habit.is_active,
                habit.icon,
                habit.frequency.as_str(),
                habit.current_interval_secs,
                habit.next_notification_at.to_rfc3339(),
                habit.consecutive_successes,
                habit.interval_multiplier,
                habit.total_attempts,
                habit.successful_attempts,
                habit.last_checked_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        if changed == 0 {
            return Err(rusqlite::Error::QueryReturnedNoRows);
        }
        Ok(())
    }
}

impl HabitStore for Database {
    fn insert(&mut self, habit: &Habit) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO habits ({HABIT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
            ),
            params![
                habit.id.to_string(),
                habit.name,
                habit.description,
                habit.created_at.to_rfc3339(),
                habit.is_active,
                habit.icon,
                habit.frequency.as_str(),
                habit.current_interval_secs,
                habit.next_notification_at.to_rfc3339(),
                habit.consecutive_successes,
                habit.interval_multiplier,
                habit.total_attempts,
                habit.successful_attempts,
                habit.last_checked_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        for event in &habit.events {
            Self::insert_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&mut self, id: HabitId) -> Result<bool, StorageError> {
        let changed = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id.to_string()])?;
        Ok(changed > 0)
    }

    fn fetch_all(&self) -> Result<Vec<Habit>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {HABIT_COLUMNS} FROM habits ORDER BY created_at, rowid"
        ))?;
        let mut habits = stmt
            .query_map([], row_to_habit)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unwrap_row_error)?;
        for habit in &mut habits {
            habit.events = self.load_events(habit.id)?;
        }
        Ok(habits)
    }

    fn fetch(&self, id: HabitId) -> Result<Option<Habit>, StorageError> {
        let habit = self
            .conn
            .query_row(
                &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
                params![id.to_string()],
                row_to_habit,
            )
            .optional()
            .map_err(unwrap_row_error)?;
        match habit {
            Some(mut habit) => {
                habit.events = self.load_events(habit.id)?;
                Ok(Some(habit))
            }
            None => Ok(None),
        }
    }

    fn save(&mut self, changes: &ChangeSet) -> Result<(), StorageError> {
        if changes.is_empty() {
            return Ok(());
        }
        // Dropping the transaction without commit rolls it back.
        let tx = self.conn.transaction()?;
        for habit in &changes.habits {
            Self::update_habit(&tx, habit).map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StorageError::QueryFailed(format!("habit {} does not exist", habit.id))
                }
                other => other.into(),
            })?;
        }
        for event in &changes.events {
            Self::insert_event(&tx, event)?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl From<StorageError> for AdapterError {
    fn from(err: StorageError) -> Self {
        AdapterError::Backend(err.to_string())
    }
}

/// Reminders are written to the `pending_reminders` table for a platform
/// process to pick up.
impl ReminderAdapter for Database {
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
        let schedule_failed = |e: rusqlite::Error| AdapterError::ScheduleFailed {
            habit_id,
            message: e.to_string(),
        };
        self.cancel(habit_id)?;
        if fire_at <= now {
            return Ok(());
        }
        self.conn
            .execute(
                "INSERT INTO pending_reminders (habit_id, fire_at, title, body, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    habit_id.to_string(),
                    fire_at.to_rfc3339(),
                    content.title,
                    content.body,
                    content.category,
                ],
            )
            .map_err(schedule_failed)?;
        Ok(())
    }

    fn cancel(&mut self, habit_id: HabitId) -> Result<(), AdapterError> {
        self.conn
            .execute(
                "DELETE FROM pending_reminders WHERE habit_id = ?1",
                params![habit_id.to_string()],
            )
            .map_err(|e| AdapterError::CancelFailed(e.to_string()))?;
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<(), AdapterError> {
        self.conn
            .execute("DELETE FROM pending_reminders", [])
            .map_err(|e| AdapterError::CancelFailed(e.to_string()))?;
        Ok(())
    }

    fn pending(&self) -> Result<Vec<PendingReminder>, AdapterError> {
        let load = || -> Result<Vec<PendingReminder>, StorageError> {
            let mut stmt = self.conn.prepare(
                "SELECT habit_id, fire_at, title, body, category
                 FROM pending_reminders
                 ORDER BY fire_at",
            )?;
            let reminders = stmt
                .query_map([], |row| {
                    Ok(PendingReminder {
                        habit_id: HabitId::from_uuid(parse_uuid(row, 0)?),
                        fire_at: parse_datetime(row, 1)?,
                        content: ReminderContent {
                            title: row.get(2)?,
                            body: row.get(3)?,
                            category: row.get(4)?,
                        },
                    })
                })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(unwrap_row_error)?;
            Ok(reminders)
        };
        Ok(load()?)
    }
}
