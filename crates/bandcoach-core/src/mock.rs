//! Mock collaborators for testing the engine without real graders.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::bail;
use async_trait::async_trait;

use crate::model::AssessmentResult;
use crate::traits::{AssessmentService, SpeechEvaluation, SpeechEvaluator};

/// An assessment service that hands out queued results in order.
///
/// Once the queue is empty every further submission fails.
pub struct MockAssessmentService {
    results: Mutex<VecDeque<AssessmentResult>>,
    call_count: AtomicU32,
}

impl MockAssessmentService {
    pub fn new(results: impl IntoIterator<Item = AssessmentResult>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            call_count: AtomicU32::new(0),
        }
    }

    /// A service that always fails to grade.
    pub fn failing() -> Self {
        Self::new([])
    }

    /// Number of submissions made to this service.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AssessmentService for MockAssessmentService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_mock_test(&self) -> anyhow::Result<AssessmentResult> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let next = self
            .results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(result) => Ok(result),
            None => bail!("no graded mock test available"),
        }
    }
}

/// A speech evaluator that always returns the same evaluation.
pub struct MockSpeechEvaluator {
    evaluation: SpeechEvaluation,
    call_count: AtomicU32,
}

impl MockSpeechEvaluator {
    pub fn with_delta(delta: f64, message: &str) -> Self {
        Self {
            evaluation: SpeechEvaluation {
                delta,
                message: message.to_string(),
            },
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechEvaluator for MockSpeechEvaluator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn evaluate(&self) -> anyhow::Result<SpeechEvaluation> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.evaluation.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: f64) -> AssessmentResult {
        AssessmentResult {
            correct_count: 30,
            total_count: 40,
            derived_score: score,
            derived_weaknesses: vec![],
        }
    }

    #[tokio::test]
    async fn results_are_served_in_order() {
        let service = MockAssessmentService::new([result(6.0), result(6.5)]);
        assert_eq!(service.submit_mock_test().await.unwrap().derived_score, 6.0);
        assert_eq!(service.submit_mock_test().await.unwrap().derived_score, 6.5);
        assert!(service.submit_mock_test().await.is_err());
        assert_eq!(service.call_count(), 3);
    }

    #[tokio::test]
    async fn fixed_evaluation() {
        let evaluator = MockSpeechEvaluator::with_delta(0.2, "Fluency improved");
        let evaluation = evaluator.evaluate().await.unwrap();
        assert_eq!(evaluation.delta, 0.2);
        assert_eq!(evaluation.message, "Fluency improved");
        assert_eq!(evaluator.call_count(), 1);
    }
}
