//! The `bandcoach record` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::{open_session, print_notification, print_score, wait_for_completion};

pub async fn execute(stop_after_ms: Option<u64>, config_path: Option<PathBuf>) -> Result<()> {
    let (_config, session) = open_session(config_path.as_deref())?;
    let events = session.subscribe();
    session.start_recording()?;
    eprintln!("Recording...");

    let notification = match stop_after_ms {
        Some(ms) => {
            tokio::select! {
                finished = wait_for_completion(&session, events) => finished?,
                _ = tokio::time::sleep(Duration::from_millis(ms)) => session.stop_recording()?,
            }
        }
        None => wait_for_completion(&session, events).await?,
    };

    print_notification(&notification);
    print_score(&session);
    Ok(())
}
