//! The `bandcoach daily-mix` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{open_session, print_notification, print_score, wait_for_completion};

pub async fn execute(category: String, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(!category.trim().is_empty(), "category must not be empty");

    let (_config, session) = open_session(config_path.as_deref())?;
    let events = session.subscribe();
    session.start_daily_mix(category.trim())?;
    eprintln!("Daily mix: {}...", category.trim());

    let notification = wait_for_completion(&session, events).await?;
    print_notification(&notification);
    print_score(&session);
    Ok(())
}
