//! The `bandcoach decay` command.

use std::path::PathBuf;

use anyhow::Result;

use bandcoach_core::decay::DecayOutcome;

use super::{open_session, print_score};

pub fn execute(amount: Option<f64>, if_inactive: bool, config_path: Option<PathBuf>) -> Result<()> {
    let (config, session) = open_session(config_path.as_deref())?;

    let outcome = if if_inactive {
        anyhow::ensure!(
            amount.is_none(),
            "--amount cannot be combined with --if-inactive"
        );
        match session.decay_if_inactive(config.inactivity_days) {
            Some(outcome) => outcome,
            None => {
                println!("No decay due.");
                return Ok(());
            }
        }
    } else {
        match amount {
            Some(amount) => session.trigger_decay_by(amount)?,
            None => session.trigger_decay(),
        }
    };

    match outcome {
        DecayOutcome::Applied { from, to } => println!("Decayed: {from:.2} -> {to:.2}"),
        DecayOutcome::Rejected { state } => println!("Decay skipped: session is in {state}"),
    }
    print_score(&session);
    Ok(())
}
