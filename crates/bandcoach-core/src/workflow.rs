//! Score-boosting workflows: targeted repair, daily mix, and recording.
//!
//! A workflow is a [`RepairTask`] plus a scheduled completion. The tasks
//! themselves do not enforce exclusivity; the
//! [`SessionController`](crate::controller::SessionController) does.

use std::fmt;
use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::controller::OverlayState;

/// Label used when a targeted repair names no topic.
pub const DEFAULT_REPAIR_LABEL: &str = "Weakness";

/// Message shown when a speaking recording finishes.
pub const RECORDING_MESSAGE: &str = "Speaking Score Updated";

/// Which workflow a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    /// Remediation of one weakness topic.
    Repair,
    /// Generic practice drill for a content category.
    DailyMix,
    /// Speaking evaluation driven by a progress timer.
    Recording,
}

impl WorkflowKind {
    /// Overlay state the controller enters while this workflow runs.
    pub fn overlay(self) -> OverlayState {
        match self {
            WorkflowKind::Repair | WorkflowKind::DailyMix => OverlayState::Repair,
            WorkflowKind::Recording => OverlayState::Recording,
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::Repair => write!(f, "repair"),
            WorkflowKind::DailyMix => write!(f, "daily mix"),
            WorkflowKind::Recording => write!(f, "recording"),
        }
    }
}

/// Lifecycle of a task: `Idle → Running → Completed → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Idle,
    Running,
    Completed,
}

/// A score-boosting task and what it will do on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairTask {
    pub kind: WorkflowKind,
    pub status: TaskStatus,
    /// Weakness topic removed on completion, if any.
    pub target_topic: Option<String>,
    /// Band delta applied on completion.
    pub boost: f64,
    /// Notification subtitle, e.g. "Match Headings Cleared".
    pub message: String,
}

impl RepairTask {
    /// Targeted repair of `topic`, or a generic weakness repair if `None`.
    pub fn repair(topic: Option<String>, boost: f64) -> Self {
        let label = topic.as_deref().unwrap_or(DEFAULT_REPAIR_LABEL);
        let message = format!("{label} Cleared");
        Self {
            kind: WorkflowKind::Repair,
            status: TaskStatus::Idle,
            target_topic: topic,
            boost,
            message,
        }
    }

    /// Untargeted drill for a content category such as "Vocab" or "Reading".
    pub fn daily_mix(category: &str, boost: f64) -> Self {
        Self {
            kind: WorkflowKind::DailyMix,
            status: TaskStatus::Idle,
            target_topic: None,
            boost,
            message: format!("{category} Completed"),
        }
    }

    pub fn recording(boost: f64) -> Self {
        Self {
            kind: WorkflowKind::Recording,
            status: TaskStatus::Idle,
            target_topic: None,
            boost,
            message: RECORDING_MESSAGE.to_string(),
        }
    }

    /// Notification title for this task's boost, e.g. "+0.1 Band".
    pub fn title(&self) -> String {
        format_band_delta(self.boost)
    }
}

/// Format a band delta the way notifications show it: "+0.05 Band".
///
/// The delta is rounded to the two decimals the score is kept at.
pub fn format_band_delta(delta: f64) -> String {
    // Adding 0.0 turns a rounded -0.0 into 0.0.
    let rounded = (delta * 100.0).round() / 100.0 + 0.0;
    if rounded < 0.0 {
        format!("{rounded} Band")
    } else {
        format!("+{rounded} Band")
    }
}

/// Progress meter of a running recording, from 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingProgress {
    value: f64,
    increment: f64,
}

impl RecordingProgress {
    pub const FULL: f64 = 100.0;

    pub fn new(increment: f64) -> Self {
        Self {
            value: 0.0,
            increment,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance by one increment. Breaks once the meter is full.
    pub fn tick(&mut self) -> ControlFlow<()> {
        self.value = (self.value + self.increment).min(Self::FULL);
        if self.value >= Self::FULL {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
