//! Collaborator trait definitions.
//!
//! The engine does not grade tests or evaluate speech itself. These async
//! traits are the seams through which external services feed it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::AssessmentResult;

// ---------------------------------------------------------------------------
// Assessment service
// ---------------------------------------------------------------------------

/// Grades a mock test and reports the derived band and weaknesses.
#[async_trait]
pub trait AssessmentService: Send + Sync {
    /// Human-readable service name (e.g. "file").
    fn name(&self) -> &str;

    /// Submit the learner's mock test and return the graded result.
    async fn submit_mock_test(&self) -> anyhow::Result<AssessmentResult>;
}

// ---------------------------------------------------------------------------
// Speech evaluation
// ---------------------------------------------------------------------------

/// Score delta produced by evaluating a recorded utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechEvaluation {
    pub delta: f64,
    pub message: String,
}

/// Evaluates the current speaking recording.
#[async_trait]
pub trait SpeechEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self) -> anyhow::Result<SpeechEvaluation>;
}
