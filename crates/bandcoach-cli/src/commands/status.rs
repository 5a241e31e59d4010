//! The `bandcoach status` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{open_session, print_score};

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let (config, session) = open_session(config_path.as_deref())?;
    let snapshot = session.snapshot();

    print_score(&session);
    let streak = &snapshot.streak;
    match streak.last_active() {
        Some(date) => println!("Streak: {} days (last practice {date})", streak.days()),
        None => println!("Streak: {} days", streak.days()),
    }
    if let Some(days) = streak.days_inactive(chrono::Utc::now().date_naive()) {
        if days >= i64::from(config.inactivity_days) && !snapshot.score.is_decayed() {
            println!("Inactive for {days} days; `bandcoach decay --if-inactive` will apply decay.");
        }
    }

    let weaknesses = session.weaknesses();
    if weaknesses.is_empty() {
        println!("No active weaknesses.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Topic", "Skill", "Impact"]);
    for weakness in &weaknesses {
        table.add_row(vec![
            Cell::new(weakness.id),
            Cell::new(&weakness.topic),
            Cell::new(weakness.skill),
            Cell::new(weakness.impact),
        ]);
    }
    println!("\n{table}");

    Ok(())
}
