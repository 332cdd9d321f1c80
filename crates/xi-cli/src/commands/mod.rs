pub mod action;
pub mod check;
pub mod config;
pub mod habit;
pub mod reminders;
pub mod respond;

use std::error::Error;

use serde_json::json;
use xi_core::{Config, Database, Habit, HabitEngine, HabitId, HabitStore, ReminderAdapter};

/// The CLI's engine: SQLite for habits, and the same database file as the
/// reminder outbox.
pub type Engine = HabitEngine<Database, Database>;

pub fn open_engine() -> Result<Engine, Box<dyn Error>> {
    let config = Config::load()?;
    tracing::debug!(
        reminders = config.reminders.enabled,
        order = ?config.queue.order,
        "opening habit database"
    );
    Ok(HabitEngine::new(Database::open()?, Database::open()?, config))
}

/// Resolve a full habit id or a unique prefix of one.
pub fn resolve_id<S: HabitStore, R: ReminderAdapter>(
    engine: &HabitEngine<S, R>,
    input: &str,
) -> Result<HabitId, Box<dyn Error>> {
    if let Ok(id) = input.parse::<HabitId>() {
        return Ok(id);
    }
    let prefix = input.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        return Err("habit id must not be empty".into());
    }

    let matches: Vec<HabitId> = engine
        .habits()?
        .iter()
        .map(Habit::id)
        .filter(|id| id.to_string().starts_with(&prefix))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(format!("Habit not found: {input}").into()),
        _ => Err(format!("ambiguous habit id '{input}' matches {} habits", matches.len()).into()),
    }
}

pub fn short_id(id: HabitId) -> String {
    id.to_string().chars().take(8).collect()
}

/// One-line summary used by list-style output.
pub fn summary_line(habit: &Habit) -> String {
    let status = if habit.is_active() { "" } else { " [inactive]" };
    format!(
        "{} {} {} ({}, x{}) next: {}{}",
        short_id(habit.id()),
        habit.icon(),
        habit.name(),
        habit.frequency(),
        habit.interval_multiplier(),
        habit.next_notification_at().format("%Y-%m-%d %H:%M"),
        status,
    )
}

/// Habit fields without the event log.
pub fn habit_json(habit: &Habit) -> serde_json::Value {
    json!({
        "id": habit.id(),
        "name": habit.name(),
        "description": habit.description(),
        "icon": habit.icon(),
        "frequency": habit.frequency(),
        "is_active": habit.is_active(),
        "created_at": habit.created_at(),
        "current_interval_secs": habit.current_interval_secs(),
        "next_notification_at": habit.next_notification_at(),
        "interval_multiplier": habit.interval_multiplier(),
        "consecutive_successes": habit.consecutive_successes(),
        "last_checked_at": habit.last_checked_at(),
    })
}
