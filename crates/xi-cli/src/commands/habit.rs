//! Habit management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use serde_json::json;
use xi_core::{Frequency, HabitUpdate, NewHabit};

use super::{habit_json, open_engine, resolve_id, summary_line};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Add {
        /// Habit name
        name: String,
        /// Habit description
        #[arg(long)]
        description: Option<String>,
        /// Display icon (default from config)
        #[arg(long)]
        icon: Option<String>,
        /// daily, weekly or monthly (default from config)
        #[arg(long)]
        frequency: Option<Frequency>,
    },
    /// List habits
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
        /// Only active habits
        #[arg(long)]
        active: bool,
    },
    /// Show a habit with its statistics and recent events
    Show {
        /// Habit ID or unique prefix
        id: String,
        /// Number of recent events to include
        #[arg(long, default_value = "10")]
        events: usize,
    },
    /// Edit a habit
    Edit {
        /// Habit ID or unique prefix
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New icon
        #[arg(long)]
        icon: Option<String>,
        /// New frequency
        #[arg(long)]
        frequency: Option<Frequency>,
    },
    /// Resume reminders for a habit
    Activate {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Pause reminders for a habit
    Deactivate {
        /// Habit ID or unique prefix
        id: String,
    },
    /// Delete a habit and its history
    Delete {
        /// Habit ID or unique prefix
        id: String,
    },
}

pub fn run(action: HabitAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let now = Utc::now();

    match action {
        HabitAction::Add {
            name,
            description,
            icon,
            frequency,
        } => {
            let new = NewHabit {
                name,
                description: description.unwrap_or_default(),
                icon,
                frequency: frequency.unwrap_or(engine.config().habits.default_frequency),
            };
            let habit = engine.create_habit(new, now)?;
            println!("Habit created: {}", habit.id());
            println!("{}", serde_json::to_string_pretty(&habit_json(&habit))?);
        }
        HabitAction::List { json, active } => {
            let habits: Vec<_> = engine
                .habits()?
                .into_iter()
                .filter(|h| !active || h.is_active())
                .collect();
            if json {
                let values: Vec<_> = habits.iter().map(habit_json).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else if habits.is_empty() {
                println!("No habits yet.");
            } else {
                for habit in &habits {
                    println!("{}", summary_line(habit));
                }
            }
        }
        HabitAction::Show { id, events } => {
            let id = resolve_id(&engine, &id)?;
            let habit = engine.habit(id)?;
            let recent: Vec<_> = habit.recent_events().into_iter().take(events).collect();
            let out = json!({
                "habit": habit_json(&habit),
                "stats": habit.stats(),
                "recent_events": recent,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        HabitAction::Edit {
            id,
            name,
            description,
            icon,
            frequency,
        } => {
            let id = resolve_id(&engine, &id)?;
            let update = HabitUpdate {
                name,
                description,
                icon,
                frequency,
            };
            if update.is_empty() {
                return Err("nothing to update (use --name, --description, --icon or --frequency)".into());
            }
            let habit = engine.update_habit(id, update, now)?;
            println!("Habit updated:");
            println!("{}", serde_json::to_string_pretty(&habit_json(&habit))?);
        }
        HabitAction::Activate { id } => {
            let id = resolve_id(&engine, &id)?;
            let habit = engine.set_active(id, true, now)?;
            println!("Habit activated: {}", summary_line(&habit));
        }
        HabitAction::Deactivate { id } => {
            let id = resolve_id(&engine, &id)?;
            let habit = engine.set_active(id, false, now)?;
            println!("Habit deactivated: {}", summary_line(&habit));
        }
        HabitAction::Delete { id } => {
            let id = resolve_id(&engine, &id)?;
            engine.delete_habit(id)?;
            println!("Habit deleted: {id}");
        }
    }
    Ok(())
}
