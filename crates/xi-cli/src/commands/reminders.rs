use chrono::{Duration, Utc};
use clap::Subcommand;
use xi_core::{ReminderAdapter, ValidationError};

use super::{open_engine, resolve_id, short_id};

#[derive(Subcommand)]
pub enum RemindersAction {
    /// List scheduled reminders
    List {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Cancel every scheduled reminder
    Clear,
    /// Schedule a test reminder for a habit
    Test {
        /// Habit ID or unique prefix
        id: String,
        /// Delay in seconds
        #[arg(long, default_value = "5")]
        delay: i64,
    },
    /// Record that a reminder was delivered
    Sent {
        /// Habit ID or unique prefix
        id: String,
    },
}

pub fn run(action: RemindersAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let now = Utc::now();

    match action {
        RemindersAction::List { json } => {
            let pending = engine.reminders().pending()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pending)?);
            } else if pending.is_empty() {
                println!("No reminders scheduled.");
            } else {
                for reminder in &pending {
                    println!(
                        "{} {} {}",
                        reminder.fire_at.format("%Y-%m-%d %H:%M"),
                        short_id(reminder.habit_id),
                        reminder.content.body,
                    );
                }
            }
        }
        RemindersAction::Clear => {
            engine.cancel_all_reminders();
            println!("All reminders cancelled");
        }
        RemindersAction::Test { id, delay } => {
            let id = resolve_id(&engine, &id)?;
            let delay = Duration::try_seconds(delay).ok_or_else(|| ValidationError::InvalidValue {
                field: "delay".into(),
                message: format!("{delay} seconds is out of range"),
            })?;
            if engine.send_test_reminder(id, delay, now)? {
                println!("Test reminder scheduled for {id}");
            } else {
                println!("Reminders are disabled; nothing scheduled");
            }
        }
        RemindersAction::Sent { id } => {
            let id = resolve_id(&engine, &id)?;
            engine.record_reminder_sent(id, now)?;
            println!("Reminder delivery recorded for {id}");
        }
    }
    Ok(())
}
