//! The `bandcoach repair` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{open_session, print_notification, print_score, wait_for_completion};

pub async fn execute(topic: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let (_config, session) = open_session(config_path.as_deref())?;
    let events = session.subscribe();
    let task = session.start_repair(topic.as_deref())?;
    eprintln!("Repairing {}...", task.target_topic.as_deref().unwrap_or("weakness"));

    let notification = wait_for_completion(&session, events).await?;
    print_notification(&notification);
    print_score(&session);
    Ok(())
}
