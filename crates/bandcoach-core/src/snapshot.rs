//! Session snapshot persistence.
//!
//! The snapshot is the contract between the engine and its storage
//! collaborator: score, streak, and weaknesses, round-tripped losslessly.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::score::{ScoreState, MAX_BAND, MIN_BAND};
use crate::streak::StreakState;
use crate::weakness::WeaknessRegistry;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persistent session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub score: ScoreState,
    #[serde(default)]
    pub streak: StreakState,
    #[serde(default)]
    pub weaknesses: WeaknessRegistry,
    /// When the snapshot was taken.
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl SessionSnapshot {
    pub fn new(score: ScoreState, streak: StreakState, weaknesses: WeaknessRegistry) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            score,
            streak,
            weaknesses,
            saved_at: None,
        }
    }

    /// Save the snapshot as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize snapshot")?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot from {}", path.display()))?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&content).context("failed to parse snapshot JSON")?;
        if snapshot.version > SNAPSHOT_VERSION {
            anyhow::bail!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        let band = snapshot.score.current();
        if !(MIN_BAND..=MAX_BAND).contains(&band) {
            anyhow::bail!("snapshot score {band} is outside the band range");
        }
        Ok(snapshot)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::new(
            ScoreState::default(),
            StreakState::default(),
            WeaknessRegistry::default(),
        )
    }
}

/// Storage collaborator for session snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<SessionSnapshot>>;

    /// Persist `snapshot`, replacing any previous one.
    fn save(&self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// Stores the snapshot as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        SessionSnapshot::load_json(&self.path).map(Some)
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        snapshot.save_json(&self.path)
    }
}

/// In-memory store, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<SessionSnapshot>>,
    saves: Mutex<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            saves: Mutex::new(0),
        }
    }

    /// Most recently saved snapshot.
    pub fn latest(&self) -> Option<SessionSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> u32 {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionSnapshot>> {
        Ok(self.latest())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
