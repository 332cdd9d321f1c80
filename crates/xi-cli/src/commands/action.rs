use chrono::Utc;
use clap::Args;
use xi_core::ReminderAction;

use super::{habit_json, open_engine, resolve_id};

#[derive(Args)]
pub struct ActionArgs {
    /// Habit ID or unique prefix
    pub id: String,
    /// YES_ACTION, NO_ACTION, LATER_ACTION; anything else opens the habit
    pub action: ReminderAction,
}

pub fn run(args: ActionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let id = resolve_id(&engine, &args.id)?;

    match engine.handle_action(id, args.action, Utc::now())? {
        Some(habit) => {
            println!("Recorded {:?} for {}", args.action, habit.name());
            println!("{}", serde_json::to_string_pretty(&habit_json(&habit))?);
        }
        // The confirmation queue lives only as long as this process.
        None => {
            let habit = engine.habit(id)?;
            println!(
                "Did you do your habit: {}? Answer with `xi respond {id} <success|failure|later>`",
                habit.name()
            );
        }
    }
    Ok(())
}
