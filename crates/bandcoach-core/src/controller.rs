//! Top-level overlay state machine.
//!
//! The controller is the single mutual-exclusion gate for score and
//! weakness mutation: at most one workflow may be active at a time, and
//! decay only applies while the session is idle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::scheduler::TaskHandle;
use crate::workflow::{RecordingProgress, RepairTask, TaskStatus};

/// Mutually exclusive overlay states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayState {
    #[default]
    None,
    /// Showing the result of a mock test.
    Feedback,
    /// A repair or daily-mix workflow is running.
    Repair,
    /// A speaking recording is running.
    Recording,
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayState::None => write!(f, "none"),
            OverlayState::Feedback => write!(f, "feedback"),
            OverlayState::Repair => write!(f, "repair"),
            OverlayState::Recording => write!(f, "recording"),
        }
    }
}

/// What to do with a running workflow when its overlay is dismissed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissPolicy {
    /// Cancel the pending completion; nothing is mutated.
    #[default]
    Cancel,
    /// Hide the overlay but let the task finish and grant its boost.
    GrantCredit,
}

/// The workflow that currently owns the session.
#[derive(Debug, Clone)]
pub struct ActiveWorkflow {
    /// Monotonic id, used to discard stale completions.
    pub id: u64,
    pub task: RepairTask,
    pub handle: TaskHandle,
    pub progress: Option<RecordingProgress>,
}

/// Overlay state plus the active workflow, if any.
#[derive(Debug, Default)]
pub struct SessionController {
    state: OverlayState,
    active: Option<ActiveWorkflow>,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn active(&self) -> Option<&ActiveWorkflow> {
        self.active.as_ref()
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut ActiveWorkflow> {
        self.active.as_mut()
    }

    /// `true` while a workflow is running, even if its overlay was dismissed.
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// `true` when nothing is shown and nothing is running.
    pub fn is_idle(&self) -> bool {
        self.state == OverlayState::None && self.active.is_none()
    }

    /// Check whether `target` may be entered right now.
    ///
    /// Returning to `None` is always allowed. Otherwise entry fails while a
    /// workflow runs. `Feedback` is informational and may be replaced by a
    /// new feedback or by a user-started workflow.
    pub fn can_enter(&self, target: OverlayState) -> Result<(), SessionError> {
        if target == OverlayState::None {
            return Ok(());
        }
        if let Some(active) = &self.active {
            return Err(SessionError::WorkflowBusy {
                active: active.task.kind.overlay(),
            });
        }
        match self.state {
            OverlayState::None | OverlayState::Feedback => Ok(()),
            busy => Err(SessionError::WorkflowBusy { active: busy }),
        }
    }

    /// Move to `target`. Returns the previous state.
    pub fn transition_to(&mut self, target: OverlayState) -> Result<OverlayState, SessionError> {
        self.can_enter(target)?;
        let previous = self.state;
        self.state = target;
        Ok(previous)
    }

    /// Enter the overlay of `workflow` and make it the active workflow.
    pub(crate) fn begin(&mut self, mut workflow: ActiveWorkflow) -> Result<(), SessionError> {
        let overlay = workflow.task.kind.overlay();
        self.can_enter(overlay)?;
        workflow.task.status = TaskStatus::Running;
        self.state = overlay;
        self.active = Some(workflow);
        Ok(())
    }

    /// Release the active workflow if it is the one identified by `id`.
    ///
    /// The overlay returns to `None` only if it still belongs to that
    /// workflow. A mismatched id means the completion is stale.
    pub(crate) fn finish(&mut self, id: u64) -> Option<ActiveWorkflow> {
        if self.active.as_ref().map(|a| a.id) != Some(id) {
            return None;
        }
        let mut workflow = self.active.take()?;
        if self.state == workflow.task.kind.overlay() {
            self.state = OverlayState::None;
        }
        workflow.task.status = TaskStatus::Completed;
        Some(workflow)
    }

    /// Dismiss the current overlay.
    ///
    /// Under [`DismissPolicy::Cancel`] the active workflow is cancelled and
    /// returned. Under [`DismissPolicy::GrantCredit`] it keeps running.
    pub(crate) fn close(&mut self, policy: DismissPolicy) -> Option<ActiveWorkflow> {
        self.state = OverlayState::None;
        match policy {
            DismissPolicy::Cancel => {
                let mut workflow = self.active.take()?;
                workflow.handle.cancel();
                workflow.task.status = TaskStatus::Idle;
                Some(workflow)
            }
            DismissPolicy::GrantCredit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(id: u64, task: RepairTask) -> ActiveWorkflow {
        ActiveWorkflow {
            id,
            task,
            handle: TaskHandle::new(),
            progress: None,
        }
    }

    #[test]
    fn idle_controller_accepts_any_overlay() {
        let mut controller = SessionController::new();
        assert!(controller.is_idle());
        assert_eq!(
            controller.transition_to(OverlayState::Feedback).unwrap(),
            OverlayState::None
        );
        assert_eq!(controller.state(), OverlayState::Feedback);
    }

    #[test]
    fn feedback_hands_off_to_workflow() {
        let mut controller = SessionController::new();
        controller.transition_to(OverlayState::Feedback).unwrap();
        controller
            .begin(workflow(1, RepairTask::repair(Some("Match Headings".into()), 0.1)))
            .unwrap();
        assert_eq!(controller.state(), OverlayState::Repair);
        assert_eq!(
            controller.active().unwrap().task.status,
            TaskStatus::Running
        );
    }

    #[test]
    fn second_workflow_is_rejected() {
        let mut controller = SessionController::new();
        controller
            .begin(workflow(1, RepairTask::daily_mix("Vocab", 0.05)))
            .unwrap();
        let err = controller
            .begin(workflow(2, RepairTask::recording(0.15)))
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::WorkflowBusy {
                active: OverlayState::Repair
            }
        );
        assert_eq!(controller.active().unwrap().id, 1);
        assert!(controller.transition_to(OverlayState::Feedback).is_err());
        assert!(controller.transition_to(OverlayState::None).is_ok());
    }

    #[test]
    fn finish_ignores_stale_ids() {
        let mut controller = SessionController::new();
        controller
            .begin(workflow(7, RepairTask::daily_mix("Reading", 0.05)))
            .unwrap();
        assert!(controller.finish(6).is_none());
        let done = controller.finish(7).unwrap();
        assert_eq!(done.task.status, TaskStatus::Completed);
        assert!(controller.is_idle());
    }

    #[test]
    fn close_cancels_under_cancel_policy() {
        let mut controller = SessionController::new();
        controller
            .begin(workflow(1, RepairTask::repair(None, 0.1)))
            .unwrap();
        let handle = controller.active().unwrap().handle.clone();
        let cancelled = controller.close(DismissPolicy::Cancel).unwrap();
        assert_eq!(cancelled.id, 1);
        assert!(handle.is_cancelled());
        assert!(controller.is_idle());
    }

    #[test]
    fn close_keeps_task_under_grant_credit() {
        let mut controller = SessionController::new();
        controller
            .begin(workflow(1, RepairTask::repair(None, 0.1)))
            .unwrap();
        assert!(controller.close(DismissPolicy::GrantCredit).is_none());
        assert_eq!(controller.state(), OverlayState::None);
        assert!(controller.is_busy());
        assert!(controller.can_enter(OverlayState::Recording).is_err());

        controller.finish(1).unwrap();
        assert!(controller.is_idle());
    }
}
