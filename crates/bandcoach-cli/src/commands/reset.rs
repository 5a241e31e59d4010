//! The `bandcoach reset` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{open_session, print_score};

pub fn execute(score: f64, keep_weaknesses: bool, config_path: Option<PathBuf>) -> Result<()> {
    let (_config, session) = open_session(config_path.as_deref())?;
    if keep_weaknesses {
        session.reset_score(score)?;
    } else {
        session.reset_progress(score)?;
        println!("Weaknesses cleared.");
    }
    print_score(&session);
    Ok(())
}
