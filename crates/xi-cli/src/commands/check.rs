//! Overdue check: scan, then present habits one at a time.

use std::io::{self, BufRead, Write};

use chrono::Utc;
use clap::Args;
use serde_json::json;
use xi_core::Response;

use super::{habit_json, open_engine, short_id, Engine};

#[derive(Args)]
pub struct CheckArgs {
    /// Prompt for each overdue habit on stdin
    #[arg(short, long)]
    pub interactive: bool,
}

pub fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = open_engine()?;
    let now = Utc::now();
    engine.scan(now)?;

    if args.interactive {
        return walk(&mut engine, io::stdin().lock());
    }

    let confirming = engine.confirming()?;
    let pending: Vec<String> = engine.queue().pending().map(|id| id.to_string()).collect();
    let out = json!({
        "confirming": confirming.as_ref().map(habit_json),
        "pending": pending,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn walk(engine: &mut Engine, input: impl BufRead) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = input.lines();
    let mut answered = 0usize;

    while let Some(habit) = engine.confirming()? {
        print!(
            "{} {} ({}) Did you do it? [y]es/[n]o/[l]ater/[q]uit: ",
            habit.icon(),
            habit.name(),
            short_id(habit.id()),
        );
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;
        let answer = line.trim();
        if matches!(answer, "q" | "quit") {
            break;
        }
        match answer.parse::<Response>() {
            Ok(response) => {
                if let Some(habit) = engine.answer(response, Utc::now())? {
                    answered += 1;
                    println!(
                        "  next reminder {}",
                        habit.next_notification_at().format("%Y-%m-%d %H:%M")
                    );
                }
            }
            Err(e) => eprintln!("  {e}"),
        }
    }

    if answered == 0 && engine.queue().confirming().is_none() {
        println!("Nothing overdue.");
    } else {
        println!("Answered {answered} habit(s).");
    }
    Ok(())
}
