//! Engine tuning and the `bandcoach.toml` configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::DismissPolicy;
use crate::decay::DEFAULT_DECAY_AMOUNT;
use crate::notification::DEFAULT_TTL;
use crate::score::ScoreState;
use crate::snapshot::SessionSnapshot;
use crate::streak::StreakState;
use crate::weakness::WeaknessRegistry;

/// Timing and boost constants for the session engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Delay before a targeted repair completes.
    pub repair_duration: Duration,
    /// Delay before a daily-mix drill completes.
    pub daily_mix_duration: Duration,
    pub repair_boost: f64,
    pub daily_mix_boost: f64,
    pub recording_boost: f64,
    /// Interval between recording progress ticks.
    pub recording_tick: Duration,
    /// Progress added per tick, out of 100.
    pub recording_increment: f64,
    pub decay_amount: f64,
    pub notification_ttl: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    pub dismiss_policy: DismissPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repair_duration: Duration::from_millis(2500),
            daily_mix_duration: Duration::from_millis(2000),
            repair_boost: 0.10,
            daily_mix_boost: 0.05,
            recording_boost: 0.15,
            recording_tick: Duration::from_millis(50),
            recording_increment: 1.5,
            decay_amount: DEFAULT_DECAY_AMOUNT,
            notification_ttl: DEFAULT_TTL,
            event_capacity: 64,
            dismiss_policy: DismissPolicy::Cancel,
        }
    }
}

/// `[session]` table of the configuration file, durations in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub repair_duration_ms: u64,
    pub daily_mix_duration_ms: u64,
    pub repair_boost: f64,
    pub daily_mix_boost: f64,
    pub recording_boost: f64,
    pub recording_tick_ms: u64,
    pub recording_increment: f64,
    pub decay_amount: f64,
    pub notification_ttl_ms: u64,
    pub dismiss_policy: DismissPolicy,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            repair_duration_ms: defaults.repair_duration.as_millis() as u64,
            daily_mix_duration_ms: defaults.daily_mix_duration.as_millis() as u64,
            repair_boost: defaults.repair_boost,
            daily_mix_boost: defaults.daily_mix_boost,
            recording_boost: defaults.recording_boost,
            recording_tick_ms: defaults.recording_tick.as_millis() as u64,
            recording_increment: defaults.recording_increment,
            decay_amount: defaults.decay_amount,
            notification_ttl_ms: defaults.notification_ttl.as_millis() as u64,
            dismiss_policy: defaults.dismiss_policy,
        }
    }
}

/// Top-level bandcoach configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// Where the session snapshot is stored.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Band used when no snapshot exists yet.
    #[serde(default = "default_initial_score")]
    pub initial_score: f64,
    /// Target band.
    #[serde(default = "default_goal")]
    pub goal: f64,
    #[serde(default)]
    pub initial_streak_days: u32,
    /// Days without practice before the inactivity monitor fires a decay.
    #[serde(default = "default_inactivity_days")]
    pub inactivity_days: u32,
    #[serde(default)]
    pub session: SessionSection,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./bandcoach-state.json")
}
fn default_initial_score() -> f64 {
    5.4
}
fn default_goal() -> f64 {
    7.5
}
fn default_inactivity_days() -> u32 {
    2
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            initial_score: default_initial_score(),
            goal: default_goal(),
            initial_streak_days: 0,
            inactivity_days: default_inactivity_days(),
            session: SessionSection::default(),
        }
    }
}

impl CoachConfig {
    /// Engine settings derived from the `[session]` table.
    pub fn session_config(&self) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            repair_duration: Duration::from_millis(s.repair_duration_ms),
            daily_mix_duration: Duration::from_millis(s.daily_mix_duration_ms),
            repair_boost: s.repair_boost,
            daily_mix_boost: s.daily_mix_boost,
            recording_boost: s.recording_boost,
            recording_tick: Duration::from_millis(s.recording_tick_ms.max(1)),
            recording_increment: s.recording_increment,
            decay_amount: s.decay_amount,
            notification_ttl: Duration::from_millis(s.notification_ttl_ms),
            dismiss_policy: s.dismiss_policy,
            ..SessionConfig::default()
        }
    }

    /// Snapshot used when the store has nothing saved yet.
    pub fn initial_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(
            ScoreState::new(self.initial_score, self.goal),
            StreakState::new(self.initial_streak_days, None),
            WeaknessRegistry::new(),
        )
    }

    /// Problems that make the configuration unusable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(0.0..=9.0).contains(&self.initial_score) {
            problems.push(format!("initial_score {} is outside 0-9", self.initial_score));
        }
        if !(0.0..=9.0).contains(&self.goal) {
            problems.push(format!("goal {} is outside 0-9", self.goal));
        }
        let s = &self.session;
        for (name, value) in [
            ("repair_boost", s.repair_boost),
            ("daily_mix_boost", s.daily_mix_boost),
            ("recording_boost", s.recording_boost),
            ("recording_increment", s.recording_increment),
            ("decay_amount", s.decay_amount),
        ] {
            if !value.is_finite() {
                problems.push(format!("session.{name} {value} is not a finite number"));
            }
        }
        if s.recording_increment <= 0.0 {
            problems.push("session.recording_increment must be positive".to_string());
        }
        problems
    }
}

impl SessionConfig {
    pub fn with_dismiss_policy(mut self, policy: DismissPolicy) -> Self {
        self.dismiss_policy = policy;
        self
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `bandcoach.toml` in the current directory
/// 2. `~/.config/bandcoach/config.toml`
///
/// Falls back to defaults if neither exists. `BANDCOACH_SNAPSHOT` overrides
/// the snapshot path.
pub fn load_config_from(path: Option<&Path>) -> Result<CoachConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("bandcoach.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CoachConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CoachConfig::default(),
    };

    if let Ok(snapshot) = std::env::var("BANDCOACH_SNAPSHOT") {
        config.snapshot_path = PathBuf::from(snapshot);
    }
    let resolved = resolve_env_vars(&config.snapshot_path.to_string_lossy());
    config.snapshot_path = PathBuf::from(resolved);

    let problems = config.validate();
    if !problems.is_empty() {
        anyhow::bail!("invalid configuration: {}", problems.join("; "));
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("bandcoach"))
}
