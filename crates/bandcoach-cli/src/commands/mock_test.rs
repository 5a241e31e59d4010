//! The `bandcoach mock-test` command.

use std::path::PathBuf;

use anyhow::Result;

use bandcoach_core::assessment::FileAssessmentService;

use super::{open_session, print_score};

pub async fn execute(result_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let (_config, session) = open_session(config_path.as_deref())?;
    let service = FileAssessmentService::new(&result_path);
    session.run_mock_test(&service).await?;

    print_score(&session);
    let weaknesses = session.weaknesses();
    println!("{} weakness(es) detected:", weaknesses.len());
    for weakness in &weaknesses {
        println!(
            "  {} ({}, {} impact)",
            weakness.topic, weakness.skill, weakness.impact
        );
    }
    if let Some(first) = weaknesses.first() {
        println!("\nNext: bandcoach repair --topic \"{}\"", first.topic);
    }

    Ok(())
}
