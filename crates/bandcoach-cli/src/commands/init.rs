//! The `bandcoach init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("bandcoach.toml"), SAMPLE_CONFIG)?;
    write_if_missing(Path::new("mock-test.toml"), EXAMPLE_MOCK_TEST)?;

    println!("\nNext steps:");
    println!("  1. Edit bandcoach.toml to set your goal band");
    println!("  2. Run: bandcoach mock-test --result mock-test.toml");
    println!("  3. Run: bandcoach repair --topic \"Match Headings\"");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# bandcoach configuration

snapshot_path = "./bandcoach-state.json"
initial_score = 5.4
goal = 7.5
initial_streak_days = 0
inactivity_days = 2

[session]
repair_duration_ms = 2500
daily_mix_duration_ms = 2000
repair_boost = 0.1
daily_mix_boost = 0.05
recording_boost = 0.15
recording_tick_ms = 50
recording_increment = 1.5
decay_amount = 0.05
notification_ttl_ms = 4000
# "cancel" drops a running drill when it is dismissed; "grant_credit" lets it finish.
dismiss_policy = "cancel"
"#;

const EXAMPLE_MOCK_TEST: &str = r#"# A graded mock test. The derived weaknesses replace any earlier set.
correct_count = 1
total_count = 8
derived_score = 4.5

[[weaknesses]]
topic = "Match Headings"
skill = "reading"
impact = "high"

[[weaknesses]]
topic = "Map Labelling"
skill = "listening"
impact = "medium"
"#;
