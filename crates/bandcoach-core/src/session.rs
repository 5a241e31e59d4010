//! Central session orchestrator.
//!
//! A [`Session`] owns the score, streak, weakness registry, overlay
//! controller, and notifications behind one lock. Mutations come from
//! exactly three places: mock-test intake, decay, and workflow completion
//! callbacks fired by the [`Scheduler`]. Every mutation is followed by a
//! snapshot save and a [`SessionEvent`] broadcast.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::assessment::AssessmentIntake;
use crate::config::SessionConfig;
use crate::controller::{ActiveWorkflow, OverlayState, SessionController};
use crate::decay::{inactivity_due, DecayOutcome, DecayScheduler};
use crate::error::SessionError;
use crate::model::{AssessmentResult, WeaknessRecord};
use crate::notification::{Notification, NotificationEmitter};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::score::{ScoreState, MAX_BAND, MIN_BAND};
use crate::snapshot::{SessionSnapshot, SnapshotStore};
use crate::streak::StreakState;
use crate::traits::{AssessmentService, SpeechEvaluation, SpeechEvaluator};
use crate::weakness::WeaknessRegistry;
use crate::workflow::{RecordingProgress, RepairTask, WorkflowKind, RECORDING_MESSAGE};

/// Recording progress is broadcast each time it crosses a multiple of this.
pub const PROGRESS_EVENT_STEP: f64 = 5.0;

/// State changes broadcast to presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    OverlayChanged { from: OverlayState, to: OverlayState },
    ScoreChanged { score: f64, decayed: bool },
    WeaknessesChanged { active: usize },
    RecordingProgress { progress: f64 },
    WorkflowStarted { task: RepairTask },
    WorkflowCompleted {
        task: RepairTask,
        notification: Notification,
    },
    WorkflowCancelled { task: RepairTask },
    NotificationExpired { id: Uuid },
}

struct SessionInner {
    score: ScoreState,
    streak: StreakState,
    weaknesses: WeaknessRegistry,
    controller: SessionController,
    notifications: NotificationEmitter,
    next_task_id: u64,
}

impl SessionInner {
    fn next_id(&mut self) -> u64 {
        self.next_task_id += 1;
        self.next_task_id
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::new(
            self.score.clone(),
            self.streak.clone(),
            self.weaknesses.clone(),
        )
    }
}

struct Shared {
    state: Mutex<SessionInner>,
    scheduler: Arc<dyn Scheduler>,
    store: Arc<dyn SnapshotStore>,
    events: broadcast::Sender<SessionEvent>,
    decay: DecayScheduler,
    config: SessionConfig,
}

/// Handle to a learner session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    /// Build a session from an already loaded snapshot.
    pub fn new(
        snapshot: SessionSnapshot,
        config: SessionConfig,
        scheduler: Arc<dyn Scheduler>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let inner = SessionInner {
            score: snapshot.score,
            streak: snapshot.streak,
            weaknesses: snapshot.weaknesses,
            controller: SessionController::new(),
            notifications: NotificationEmitter::new(config.notification_ttl),
            next_task_id: 0,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(inner),
                scheduler,
                store,
                events,
                decay: DecayScheduler::new(config.decay_amount),
                config,
            }),
        }
    }

    /// Load the stored snapshot, falling back to `initial` if none exists.
    pub fn open(
        initial: SessionSnapshot,
        config: SessionConfig,
        scheduler: Arc<dyn Scheduler>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self> {
        let snapshot = store
            .load()
            .context("failed to load session snapshot")?
            .unwrap_or(initial);
        Ok(Self::new(snapshot, config, scheduler, store))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    // -- read-only views ---------------------------------------------------

    pub fn score(&self) -> ScoreState {
        self.shared.lock().score.clone()
    }

    pub fn streak(&self) -> StreakState {
        self.shared.lock().streak.clone()
    }

    /// Active weaknesses in display order.
    pub fn weaknesses(&self) -> Vec<WeaknessRecord> {
        self.shared.lock().weaknesses.list_active().to_vec()
    }

    pub fn overlay(&self) -> OverlayState {
        self.shared.lock().controller.state()
    }

    /// The running task, if any (it may outlive a dismissed overlay).
    pub fn active_task(&self) -> Option<RepairTask> {
        self.shared
            .lock()
            .controller
            .active()
            .map(|a| a.task.clone())
    }

    pub fn recording_progress(&self) -> Option<f64> {
        self.shared
            .lock()
            .controller
            .active()
            .and_then(|a| a.progress)
            .map(|p| p.value())
    }

    pub fn active_notifications(&self) -> Vec<Notification> {
        self.shared.lock().notifications.active().to_vec()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    // -- assessment --------------------------------------------------------

    /// Apply a graded mock test and enter the feedback overlay.
    pub fn ingest_mock_test(&self, result: &AssessmentResult) -> Result<(), SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        let from = inner.controller.state();
        let SessionInner {
            score,
            weaknesses,
            controller,
            ..
        } = &mut *inner;

        if let Err(e) = AssessmentIntake::ingest_mock_test(result, score, weaknesses, controller) {
            tracing::warn!("mock test rejected: {e}");
            return Err(e);
        }
        let today = shared.scheduler.now().date_naive();
        inner.streak.record_practice(today);

        shared.emit_score(&inner);
        shared.emit(SessionEvent::WeaknessesChanged {
            active: inner.weaknesses.len(),
        });
        shared.emit_overlay(from, inner.controller.state());
        shared.persist(&inner);
        Ok(())
    }

    /// Ask `service` for a graded mock test and ingest it.
    pub async fn run_mock_test(&self, service: &dyn AssessmentService) -> Result<()> {
        let result = service
            .submit_mock_test()
            .await
            .with_context(|| format!("assessment service '{}' failed", service.name()))?;
        self.ingest_mock_test(&result)?;
        Ok(())
    }

    // -- decay -------------------------------------------------------------

    /// Decay by the configured amount. A no-op unless the session is idle.
    pub fn trigger_decay(&self) -> DecayOutcome {
        let mut inner = self.shared.lock();
        self.shared.apply_decay(&mut inner, self.shared.decay.amount())
    }

    /// Decay by an explicit `amount`, which must be finite.
    pub fn trigger_decay_by(&self, amount: f64) -> Result<DecayOutcome, SessionError> {
        if !amount.is_finite() {
            tracing::warn!(amount, "decay rejected: amount is not finite");
            return Err(SessionError::InvalidDelta(amount));
        }
        let mut inner = self.shared.lock();
        Ok(self.shared.apply_decay(&mut inner, amount))
    }

    /// Inactivity monitor hook: decay once if the learner has not practised
    /// for `threshold_days` and the score is not already decayed.
    pub fn decay_if_inactive(&self, threshold_days: u32) -> Option<DecayOutcome> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        let today = shared.scheduler.now().date_naive();
        if !inactivity_due(&inner.streak, &inner.score, today, threshold_days) {
            return None;
        }
        Some(shared.apply_decay(&mut inner, shared.decay.amount()))
    }

    // -- workflows ---------------------------------------------------------

    /// Start a targeted repair. Completes after the repair duration,
    /// removing `topic` from the registry and boosting the score.
    pub fn start_repair(&self, topic: Option<&str>) -> Result<RepairTask, SessionError> {
        let config = &self.shared.config;
        let task = RepairTask::repair(topic.map(str::to_string), config.repair_boost);
        self.shared.start_timed(task, config.repair_duration)
    }

    /// Start an untargeted daily-mix drill for `category`.
    pub fn start_daily_mix(&self, category: &str) -> Result<RepairTask, SessionError> {
        let config = &self.shared.config;
        let task = RepairTask::daily_mix(category, config.daily_mix_boost);
        self.shared.start_timed(task, config.daily_mix_duration)
    }

    /// Start a speaking recording. Progress ticks on a repeating timer and
    /// the recording completes by itself once it reaches 100.
    pub fn start_recording(&self) -> Result<RepairTask, SessionError> {
        let shared = &self.shared;
        let config = &shared.config;
        let task = RepairTask::recording(config.recording_boost);

        let mut inner = shared.lock();
        if let Err(e) = inner.controller.can_enter(task.kind.overlay()) {
            tracing::warn!("recording rejected: {e}");
            return Err(e);
        }
        let id = inner.next_id();
        let weak = Arc::downgrade(shared);
        let handle = shared.scheduler.schedule_every(
            config.recording_tick,
            Box::new(move || match weak.upgrade() {
                Some(shared) => shared.tick_recording(id),
                None => ControlFlow::Break(()),
            }),
        );
        let progress = Some(RecordingProgress::new(config.recording_increment));
        shared.begin(&mut inner, id, task, handle, progress)
    }

    /// Stop the recording early with the fixed recording boost.
    pub fn stop_recording(&self) -> Result<Notification, SessionError> {
        let boost = self.shared.config.recording_boost;
        self.on_recording_finished(boost, RECORDING_MESSAGE)
    }

    /// Finish the running recording with a delta from speech evaluation.
    pub fn on_recording_finished(
        &self,
        delta: f64,
        message: &str,
    ) -> Result<Notification, SessionError> {
        if !delta.is_finite() {
            tracing::warn!(delta, "speech evaluation rejected: delta is not finite");
            return Err(SessionError::InvalidDelta(delta));
        }
        let shared = &self.shared;
        let mut inner = shared.lock();
        let id = match inner.controller.active() {
            Some(active) if active.task.kind == WorkflowKind::Recording => active.id,
            _ => {
                return Err(SessionError::NotRecording {
                    state: inner.controller.state(),
                })
            }
        };
        let evaluation = SpeechEvaluation {
            delta,
            message: message.to_string(),
        };
        shared
            .complete(&mut inner, id, Some(evaluation))
            .ok_or(SessionError::NotRecording {
                state: OverlayState::None,
            })
    }

    /// Ask `evaluator` to score the running recording and finish it.
    pub async fn evaluate_recording(&self, evaluator: &dyn SpeechEvaluator) -> Result<Notification> {
        let recording = self
            .active_task()
            .is_some_and(|t| t.kind == WorkflowKind::Recording);
        if !recording {
            return Err(SessionError::NotRecording {
                state: self.overlay(),
            }
            .into());
        }
        let evaluation = evaluator
            .evaluate()
            .await
            .with_context(|| format!("speech evaluator '{}' failed", evaluator.name()))?;
        Ok(self.on_recording_finished(evaluation.delta, &evaluation.message)?)
    }

    /// Dismiss the current overlay. Returns the task that was cancelled, if
    /// the dismiss policy cancelled one.
    pub fn close_overlay(&self) -> Option<RepairTask> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        let from = inner.controller.state();
        let cancelled = inner.controller.close(shared.config.dismiss_policy);
        shared.emit_overlay(from, inner.controller.state());

        match &cancelled {
            Some(workflow) => {
                tracing::info!(kind = %workflow.task.kind, "workflow cancelled on dismiss");
                shared.emit(SessionEvent::WorkflowCancelled {
                    task: workflow.task.clone(),
                });
            }
            None => {
                if let Some(active) = inner.controller.active() {
                    tracing::info!(kind = %active.task.kind, "overlay dismissed, workflow continues");
                }
            }
        }
        cancelled.map(|w| w.task)
    }

    // -- administration ----------------------------------------------------

    /// Override the score. Weaknesses are kept.
    pub fn reset_score(&self, value: f64) -> Result<(), SessionError> {
        self.reset(value, false)
    }

    /// Override the score and clear every weakness.
    pub fn reset_progress(&self, value: f64) -> Result<(), SessionError> {
        self.reset(value, true)
    }

    fn reset(&self, value: f64, clear_weaknesses: bool) -> Result<(), SessionError> {
        if !(MIN_BAND..=MAX_BAND).contains(&value) {
            return Err(SessionError::ScoreOutOfRange(value));
        }
        let shared = &self.shared;
        let mut inner = shared.lock();
        if let Some(active) = inner.controller.active() {
            return Err(SessionError::WorkflowBusy {
                active: active.task.kind.overlay(),
            });
        }
        inner.score.reset(value);
        if clear_weaknesses {
            inner.weaknesses.clear();
            shared.emit(SessionEvent::WeaknessesChanged { active: 0 });
        }
        tracing::info!(score = value, clear_weaknesses, "session reset");
        shared.emit_score(&inner);
        shared.persist(&inner);
        Ok(())
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine; presentation may not be listening.
        let _ = self.events.send(event);
    }

    fn emit_score(&self, inner: &SessionInner) {
        self.emit(SessionEvent::ScoreChanged {
            score: inner.score.current(),
            decayed: inner.score.is_decayed(),
        });
    }

    fn emit_overlay(&self, from: OverlayState, to: OverlayState) {
        if from != to {
            self.emit(SessionEvent::OverlayChanged { from, to });
        }
    }

    fn persist(&self, inner: &SessionInner) {
        let mut snapshot = inner.snapshot();
        snapshot.saved_at = Some(self.scheduler.now());
        if let Err(e) = self.store.save(&snapshot) {
            tracing::error!("failed to save session snapshot: {e:#}");
        }
    }

    fn apply_decay(&self, inner: &mut SessionInner, amount: f64) -> DecayOutcome {
        let outcome = self
            .decay
            .trigger_by(amount, &inner.controller, &mut inner.score);
        if outcome.is_applied() {
            self.emit_score(inner);
            self.persist(inner);
        }
        outcome
    }

    fn start_timed(
        self: &Arc<Self>,
        task: RepairTask,
        delay: Duration,
    ) -> Result<RepairTask, SessionError> {
        let mut inner = self.lock();
        if let Err(e) = inner.controller.can_enter(task.kind.overlay()) {
            tracing::warn!(kind = %task.kind, "workflow rejected: {e}");
            return Err(e);
        }
        let id = inner.next_id();
        let weak = Arc::downgrade(self);
        let handle = self.scheduler.schedule_after(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    let mut inner = shared.lock();
                    shared.complete(&mut inner, id, None);
                }
            }),
        );
        self.begin(&mut inner, id, task, handle, None)
    }

    fn begin(
        &self,
        inner: &mut SessionInner,
        id: u64,
        task: RepairTask,
        handle: TaskHandle,
        progress: Option<RecordingProgress>,
    ) -> Result<RepairTask, SessionError> {
        let from = inner.controller.state();
        let workflow = ActiveWorkflow {
            id,
            task,
            handle: handle.clone(),
            progress,
        };
        if let Err(e) = inner.controller.begin(workflow) {
            handle.cancel();
            return Err(e);
        }
        let task = inner
            .controller
            .active()
            .map(|a| a.task.clone())
            .ok_or(SessionError::WorkflowBusy { active: from })?;

        tracing::info!(
            kind = %task.kind,
            target = task.target_topic.as_deref().unwrap_or("-"),
            "workflow started"
        );
        self.emit_overlay(from, inner.controller.state());
        self.emit(SessionEvent::WorkflowStarted { task: task.clone() });
        Ok(task)
    }

    fn tick_recording(self: &Arc<Self>, id: u64) -> ControlFlow<()> {
        let mut inner = self.lock();
        let ticked = inner
            .controller
            .active_mut()
            .filter(|a| a.id == id)
            .and_then(|a| a.progress.as_mut())
            .map(|progress| {
                let before = progress.value();
                (progress.tick(), before, progress.value())
            });
        let Some((flow, before, value)) = ticked else {
            tracing::debug!(id, "recording timer outlived its workflow");
            return ControlFlow::Break(());
        };

        // Progress is coalesced so a full recording fits the event buffer.
        let step = |v: f64| (v / PROGRESS_EVENT_STEP).floor();
        if step(value) > step(before) {
            self.emit(SessionEvent::RecordingProgress { progress: value });
        }
        if flow.is_break() {
            self.complete(&mut inner, id, None);
        }
        flow
    }

    /// Apply the completion of workflow `id`. Returns `None` if `id` is no
    /// longer the active workflow.
    fn complete(
        self: &Arc<Self>,
        inner: &mut SessionInner,
        id: u64,
        evaluation: Option<SpeechEvaluation>,
    ) -> Option<Notification> {
        let from = inner.controller.state();
        let Some(workflow) = inner.controller.finish(id) else {
            tracing::debug!(id, "discarding stale workflow completion");
            return None;
        };
        workflow.handle.cancel();

        let mut task = workflow.task;
        if let Some(evaluation) = evaluation {
            task.boost = evaluation.delta;
            task.message = evaluation.message;
        }

        let score = inner.score.apply_delta(task.boost);
        inner.score.clear_decay();
        if let Some(topic) = &task.target_topic {
            if inner.weaknesses.remove_by_topic(topic) {
                self.emit(SessionEvent::WeaknessesChanged {
                    active: inner.weaknesses.len(),
                });
            } else {
                tracing::warn!(topic = %topic, "repair target not active, treating as generic drill");
            }
        }
        let now = self.scheduler.now();
        inner.streak.record_practice(now.date_naive());

        let notification = inner
            .notifications
            .emit(task.title(), task.message.clone(), now);
        self.schedule_expiry(notification.id, notification.ttl);

        tracing::info!(kind = %task.kind, boost = task.boost, score, "workflow completed");
        self.emit_score(inner);
        self.emit_overlay(from, inner.controller.state());
        self.emit(SessionEvent::WorkflowCompleted {
            task,
            notification: notification.clone(),
        });
        self.persist(inner);
        Some(notification)
    }

    fn schedule_expiry(self: &Arc<Self>, id: Uuid, ttl: Duration) {
        let weak = Arc::downgrade(self);
        self.scheduler.schedule_after(
            ttl,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let expired = shared.lock().notifications.expire(id);
                if expired {
                    tracing::debug!(%id, "notification expired");
                    shared.emit(SessionEvent::NotificationExpired { id });
                }
            }),
        );
    }
}
