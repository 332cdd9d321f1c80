use chrono::Utc;
use clap::Args;
use xi_core::Response;

use super::{habit_json, open_engine, resolve_id};

#[derive(Args)]
pub struct RespondArgs {
    /// Habit ID or unique prefix
    pub id: String,
    /// success, failure or later (y/n/l also accepted)
    pub response: Response,
}

pub fn run(args: RespondArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let id = resolve_id(&engine, &args.id)?;
    let habit = engine.record_response(id, args.response, Utc::now())?;

    println!(
        "Recorded {:?} for {}. Next reminder: {}",
        args.response,
        habit.name(),
        habit.next_notification_at().format("%Y-%m-%d %H:%M"),
    );
    println!("{}", serde_json::to_string_pretty(&habit_json(&habit))?);
    Ok(())
}
