//! Database schema migrations for xi.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(tx: &rusqlite::Transaction<'_>, version: i32) -> SqliteResult<()> {
    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: habits and their append-only event log.
///
/// Events cascade with their habit.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id                    TEXT PRIMARY KEY,
            name                  TEXT NOT NULL,
            description           TEXT NOT NULL DEFAULT '',
            created_at            TEXT NOT NULL,
            is_active             INTEGER NOT NULL DEFAULT 1,
            icon                  TEXT NOT NULL DEFAULT '',
            frequency             TEXT NOT NULL DEFAULT 'daily',
            current_interval_secs INTEGER NOT NULL,
            next_notification_at  TEXT NOT NULL,
            consecutive_successes INTEGER NOT NULL DEFAULT 0,
            interval_multiplier   INTEGER NOT NULL DEFAULT 1,
            total_attempts        INTEGER NOT NULL DEFAULT 0,
            successful_attempts   INTEGER NOT NULL DEFAULT 0,
            last_checked_at       TEXT
        );

        CREATE TABLE IF NOT EXISTS habit_events (
            id            TEXT PRIMARY KEY,
            habit_id      TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            timestamp     TEXT NOT NULL,
            kind          TEXT NOT NULL,
            interval_secs INTEGER,
            note          TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_habit_events_habit_id ON habit_events(habit_id);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: persistent reminder outbox and a timestamp index for
/// history queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS pending_reminders (
            habit_id TEXT PRIMARY KEY REFERENCES habits(id) ON DELETE CASCADE,
            fire_at  TEXT NOT NULL,
            title    TEXT NOT NULL,
            body     TEXT NOT NULL,
            category TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habit_events_habit_timestamp
            ON habit_events(habit_id, timestamp);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
