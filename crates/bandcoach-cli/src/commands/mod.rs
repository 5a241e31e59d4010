//! Subcommand implementations and the plumbing they share.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use bandcoach_core::config::{load_config_from, CoachConfig};
use bandcoach_core::notification::Notification;
use bandcoach_core::scheduler::TokioScheduler;
use bandcoach_core::snapshot::JsonFileStore;
use bandcoach_core::workflow::RepairTask;
use bandcoach_core::{Session, SessionEvent};

pub mod daily_mix;
pub mod decay;
pub mod init;
pub mod mock_test;
pub mod record;
pub mod repair;
pub mod reset;
pub mod status;

/// Load the config and open the session stored at its snapshot path.
pub fn open_session(config_path: Option<&Path>) -> Result<(CoachConfig, Session)> {
    let config = load_config_from(config_path)?;
    let scheduler = Arc::new(TokioScheduler::current()?);
    let store = Arc::new(JsonFileStore::new(&config.snapshot_path));
    let session = Session::open(
        config.initial_snapshot(),
        config.session_config(),
        scheduler,
        store,
    )
    .with_context(|| {
        format!(
            "failed to open session at {}",
            config.snapshot_path.display()
        )
    })?;
    tracing::debug!(
        snapshot = %config.snapshot_path.display(),
        score = session.score().current(),
        "session opened"
    );
    Ok((config, session))
}

/// Wait for the running workflow to complete, printing recording progress.
/// `events` must be subscribed before the workflow is started.
///
/// Ctrl-C dismisses the overlay. Whether that cancels the workflow depends
/// on the configured dismiss policy; either way the process exits before
/// any credit is granted.
pub async fn wait_for_completion(
    session: &Session,
    mut events: Receiver<SessionEvent>,
) -> Result<Notification> {
    let mut last_reported = 0.0;
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                let cancelled = session.close_overlay();
                anyhow::bail!(interrupt_message(cancelled.as_ref()));
            }
        };
        match event {
            Ok(SessionEvent::WorkflowCompleted { notification, .. }) => return Ok(notification),
            Ok(SessionEvent::WorkflowCancelled { task }) => {
                anyhow::bail!("{} workflow was cancelled", task.kind)
            }
            Ok(SessionEvent::RecordingProgress { progress }) => {
                if progress - last_reported >= 25.0 || progress >= 100.0 {
                    eprintln!("  Recording... {progress:.0}%");
                    last_reported = progress;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "session event receiver lagged");
            }
            Ok(_) => {}
            Err(RecvError::Closed) => anyhow::bail!("session closed before the workflow finished"),
        }
    }
}

fn interrupt_message(cancelled: Option<&RepairTask>) -> String {
    match cancelled {
        Some(task) => format!("interrupted, {} workflow cancelled", task.kind),
        None => "interrupted before the workflow finished, no credit granted".to_string(),
    }
}

pub fn print_notification(notification: &Notification) {
    println!("{}  {}", notification.title, notification.subtitle);
}

pub fn print_score(session: &Session) {
    let score = session.score();
    println!(
        "Score: {:.2} / {:.1} ({:.0}% of goal){}",
        score.current(),
        score.goal(),
        score.progress_to_goal(),
        if score.is_decayed() { " [decayed]" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_message_reflects_dismiss_outcome() {
        let task = RepairTask::daily_mix("Vocab", 0.05);
        assert_eq!(
            interrupt_message(Some(&task)),
            "interrupted, daily mix workflow cancelled"
        );
        assert!(!interrupt_message(None).contains("cancelled"));
    }
}
