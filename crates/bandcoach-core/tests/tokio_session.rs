//! Session driven by real tokio timers under paused time.

use std::sync::Arc;
use std::time::Duration;

use bandcoach_core::config::SessionConfig;
use bandcoach_core::controller::{DismissPolicy, OverlayState};
use bandcoach_core::notification::Notification;
use bandcoach_core::scheduler::TokioScheduler;
use bandcoach_core::snapshot::{MemoryStore, SessionSnapshot};
use bandcoach_core::{Session, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::Instant;

fn session(config: SessionConfig) -> (Session, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let scheduler = Arc::new(TokioScheduler::current().unwrap());
    let session = Session::new(SessionSnapshot::default(), config, scheduler, store.clone());
    (session, store)
}

async fn next_completion(mut events: Receiver<SessionEvent>) -> Notification {
    loop {
        match events.recv().await {
            Ok(SessionEvent::WorkflowCompleted { notification, .. }) => return notification,
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("session dropped"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn repair_completes_after_configured_delay() {
    let (session, store) = session(SessionConfig::default());
    let started = Instant::now();

    let waiter = tokio::spawn(next_completion(session.subscribe()));
    session.start_repair(None).unwrap();

    let notification = waiter.await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2500));
    assert_eq!(notification.title, "+0.1 Band");
    assert_eq!(session.score().current(), 5.5);
    assert_eq!(session.overlay(), OverlayState::None);
    assert_eq!(store.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn recording_completes_when_meter_fills() {
    let (session, _store) = session(SessionConfig::default());
    let started = Instant::now();

    let waiter = tokio::spawn(next_completion(session.subscribe()));
    session.start_recording().unwrap();

    let notification = waiter.await.unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3350), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3400), "{elapsed:?}");
    assert_eq!(notification.subtitle, "Speaking Score Updated");
    assert_eq!(session.score().current(), 5.55);
    assert!(session.recording_progress().is_none());
}

#[tokio::test(start_paused = true)]
async fn cancelled_repair_never_fires() {
    let (session, store) = session(SessionConfig::default());
    session.start_repair(None).unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let cancelled = session.close_overlay();
    assert!(cancelled.is_some());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(session.score().current(), 5.4);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn grant_credit_finishes_in_background() {
    let config = SessionConfig::default().with_dismiss_policy(DismissPolicy::GrantCredit);
    let (session, _store) = session(config);
    session.start_daily_mix("Vocab").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(session.close_overlay().is_none());

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(session.score().current(), 5.45);
    assert!(session.active_task().is_none());

    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert!(session.active_notifications().is_empty());
}
