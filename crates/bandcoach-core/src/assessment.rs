//! Mock-test intake.
//!
//! Validates an [`AssessmentResult`], applies it to the score and weakness
//! registry, and parses result files written by the assessment service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::controller::{OverlayState, SessionController};
use crate::error::SessionError;
use crate::model::{AssessmentResult, WeaknessRecord};
use crate::score::ScoreState;
use crate::traits::AssessmentService;
use crate::weakness::WeaknessRegistry;

/// Reject malformed results before anything is mutated.
pub fn validate_assessment(result: &AssessmentResult) -> Result<(), SessionError> {
    let reason = if result.total_count == 0 {
        "total count is zero"
    } else if result.correct_count > result.total_count {
        "correct count exceeds total count"
    } else if !result.derived_score.is_finite() {
        "derived score is not a finite number"
    } else {
        return Ok(());
    };
    Err(SessionError::InvalidAssessment {
        correct: result.correct_count,
        total: result.total_count,
        reason,
    })
}

/// Applies validated mock-test results.
pub struct AssessmentIntake;

impl AssessmentIntake {
    /// Set the score from `result`, clear decay, replace the weakness set,
    /// and enter the feedback overlay.
    ///
    /// On error nothing has been touched.
    pub fn ingest_mock_test(
        result: &AssessmentResult,
        score: &mut ScoreState,
        weaknesses: &mut WeaknessRegistry,
        controller: &mut SessionController,
    ) -> Result<(), SessionError> {
        validate_assessment(result)?;
        controller.can_enter(OverlayState::Feedback)?;

        let band = score.set(result.derived_score);
        score.clear_decay();
        let added = weaknesses.replace(result.derived_weaknesses.iter().cloned());
        controller.transition_to(OverlayState::Feedback)?;

        tracing::info!(
            correct = result.correct_count,
            total = result.total_count,
            band,
            weaknesses = added,
            "mock test ingested"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TOML result files
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlAssessment {
    correct_count: u32,
    total_count: u32,
    derived_score: f64,
    #[serde(default)]
    weaknesses: Vec<TomlWeakness>,
}

#[derive(Debug, Deserialize)]
struct TomlWeakness {
    #[serde(default)]
    id: Option<u32>,
    topic: String,
    skill: String,
    #[serde(default = "default_impact")]
    impact: String,
}

fn default_impact() -> String {
    "medium".to_string()
}

/// Parse a TOML string into an `AssessmentResult` (useful for testing).
///
/// Weaknesses without an explicit `id` are numbered by position, from 1.
pub fn parse_assessment_str(content: &str, source_path: &Path) -> Result<AssessmentResult> {
    let parsed: TomlAssessment = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let derived_weaknesses = parsed
        .weaknesses
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            let skill = w.skill.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
            let impact = w.impact.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
            Ok(WeaknessRecord {
                id: w.id.unwrap_or(i as u32 + 1),
                topic: w.topic,
                skill,
                impact,
            })
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid weakness in {}", source_path.display()))?;

    Ok(AssessmentResult {
        correct_count: parsed.correct_count,
        total_count: parsed.total_count,
        derived_score: parsed.derived_score,
        derived_weaknesses,
    })
}

/// Assessment service that reads a graded result from a TOML file.
#[derive(Debug, Clone)]
pub struct FileAssessmentService {
    path: PathBuf,
}

impl FileAssessmentService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AssessmentService for FileAssessmentService {
    fn name(&self) -> &str {
        "file"
    }

    async fn submit_mock_test(&self) -> Result<AssessmentResult> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read assessment file: {}", self.path.display()))?;
        parse_assessment_str(&content, &self.path)
    }
}
