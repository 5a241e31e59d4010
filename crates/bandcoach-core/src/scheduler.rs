//! Logical timer scheduling for workflow completions.
//!
//! Workflows never sleep; they hand a callback to a [`Scheduler`] and keep
//! the returned [`TaskHandle`] so the callback can be cancelled. Two
//! implementations are provided:
//!
//! - [`VirtualScheduler`]: a deterministic virtual clock advanced by hand,
//!   used by tests and simulations.
//! - [`TokioScheduler`]: spawns timers on a tokio runtime. Under
//!   `tokio::time::pause` it is driven by tokio's own virtual clock.

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// One-shot timer callback.
pub type OnceTask = Box<dyn FnOnce() + Send + 'static>;

/// Repeating timer callback. Returning `Break` stops the timer.
pub type RepeatingTask = Box<dyn FnMut() -> ControlFlow<()> + Send + 'static>;

/// Something that can run callbacks after a delay.
pub trait Scheduler: Send + Sync {
    /// Current wall-clock time as seen by this scheduler.
    fn now(&self) -> DateTime<Utc>;

    /// Run `task` once after `delay`.
    fn schedule_after(&self, delay: Duration, task: OnceTask) -> TaskHandle;

    /// Run `task` every `period`, first after one period, until it breaks
    /// or the handle is cancelled.
    fn schedule_every(&self, period: Duration, task: RepeatingTask) -> TaskHandle;
}

/// Cancellation handle for a scheduled task.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prevent any further invocation of the task's callback.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Virtual scheduler
// ---------------------------------------------------------------------------

enum TimerKind {
    Once(OnceTask),
    Every { period: Duration, task: RepeatingTask },
}

struct Timer {
    handle: TaskHandle,
    kind: TimerKind,
}

struct VirtualState {
    elapsed: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), Timer>,
}

impl VirtualState {
    fn push(&mut self, deadline: Duration, timer: Timer) {
        self.seq += 1;
        self.queue.insert((deadline, self.seq), timer);
    }
}

/// Deterministic scheduler driven by [`VirtualScheduler::advance`].
///
/// Due callbacks fire in deadline order, FIFO for equal deadlines. The
/// internal lock is released while a callback runs, so callbacks may
/// schedule further timers.
pub struct VirtualScheduler {
    epoch: DateTime<Utc>,
    state: Mutex<VirtualState>,
}

impl VirtualScheduler {
    /// Start a virtual clock at `epoch`.
    pub fn new(epoch: DateTime<Utc>) -> Self {
        Self {
            epoch,
            state: Mutex::new(VirtualState {
                elapsed: Duration::ZERO,
                seq: 0,
                queue: BTreeMap::new(),
            }),
        }
    }

    /// Virtual time elapsed since the epoch.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Number of timers still queued (cancelled ones included until reached).
    pub fn pending(&self) -> usize {
        self.lock().queue.len()
    }

    /// Move the clock forward by `by`, firing every callback that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().elapsed + by;

        loop {
            let next = {
                let mut state = self.lock();
                let due = state
                    .queue
                    .first_key_value()
                    .map(|(&(deadline, _), _)| deadline)
                    .filter(|deadline| *deadline <= target);
                match due {
                    Some(deadline) => {
                        state.elapsed = deadline;
                        state.queue.pop_first()
                    }
                    None => None,
                }
            };
            let Some(((deadline, _), timer)) = next else {
                break;
            };
            if timer.handle.is_cancelled() {
                continue;
            }
            match timer.kind {
                TimerKind::Once(task) => task(),
                TimerKind::Every { period, mut task } => {
                    if task().is_continue() && !timer.handle.is_cancelled() {
                        self.lock().push(
                            deadline + period,
                            Timer {
                                handle: timer.handle,
                                kind: TimerKind::Every { period, task },
                            },
                        );
                    }
                }
            }
        }

        self.lock().elapsed = target;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> DateTime<Utc> {
        TimeDelta::from_std(self.elapsed())
            .ok()
            .and_then(|elapsed| self.epoch.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn schedule_after(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut state = self.lock();
        let deadline = state.elapsed + delay;
        state.push(
            deadline,
            Timer {
                handle: handle.clone(),
                kind: TimerKind::Once(task),
            },
        );
        handle
    }

    fn schedule_every(&self, period: Duration, task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut state = self.lock();
        let deadline = state.elapsed + period;
        state.push(
            deadline,
            Timer {
                handle: handle.clone(),
                kind: TimerKind::Every { period, task },
            },
        );
        handle
    }
}

// ---------------------------------------------------------------------------
// Tokio scheduler
// ---------------------------------------------------------------------------

/// Scheduler backed by tokio timers.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| anyhow::anyhow!("no tokio runtime available: {e}"))?;
        Ok(Self::new(runtime))
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn schedule_after(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let guard = handle.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !guard.is_cancelled() {
                task();
            }
        });
        handle
    }

    fn schedule_every(&self, period: Duration, mut task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let guard = handle.clone();
        self.runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticks = tokio::time::interval_at(start, period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if guard.is_cancelled() || task().is_break() {
                    break;
                }
            }
        });
        handle
    }
}
