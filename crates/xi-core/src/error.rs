//! Core error types for xi-core.
//!
//! Storage and validation failures propagate to the caller. Reminder adapter
//! failures are reported through [`AdapterError`] but the engine logs and
//! swallows them, so they never roll back a habit state change.

use std::path::PathBuf;
use thiserror::Error;

use crate::habit::HabitId;

/// Core error type for xi-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reminder delivery errors
    #[error("Reminder error: {0}")]
    Adapter(#[from] AdapterError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The referenced habit does not exist (or was deleted)
    #[error("Habit not found: {0}")]
    NotFound(HabitId),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored row could not be mapped back to a record
    #[error("Corrupt record: {message}")]
    Corrupt { message: String },
}

/// Reminder adapter errors.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Failed to schedule reminder for {habit_id}: {message}")]
    ScheduleFailed { habit_id: HabitId, message: String },

    #[error("Failed to cancel reminder: {0}")]
    CancelFailed(String),

    /// The store backing the adapter failed
    #[error("Reminder backend error: {0}")]
    Backend(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors, raised before any state mutation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Habit names must contain at least one non-whitespace character
    #[error("Habit name must not be empty")]
    EmptyName,

    /// Frequency string is not one of daily, weekly, monthly
    #[error("Unknown frequency '{0}' (expected daily, weekly or monthly)")]
    UnknownFrequency(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
