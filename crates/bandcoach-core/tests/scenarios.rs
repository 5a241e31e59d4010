//! End-to-end session scenarios on a virtual clock.

use std::sync::Arc;
use std::time::Duration;

use bandcoach_core::config::SessionConfig;
use bandcoach_core::controller::OverlayState;
use bandcoach_core::decay::DecayOutcome;
use bandcoach_core::model::{AssessmentResult, Impact, Skill, WeaknessRecord};
use bandcoach_core::scheduler::VirtualScheduler;
use bandcoach_core::score::ScoreState;
use bandcoach_core::snapshot::{JsonFileStore, MemoryStore, SessionSnapshot, SnapshotStore};
use bandcoach_core::streak::StreakState;
use bandcoach_core::weakness::WeaknessRegistry;
use bandcoach_core::{Session, SessionError, SessionEvent};
use tokio::sync::broadcast::error::TryRecvError;

fn start(score: f64, streak: u32) -> (Session, Arc<VirtualScheduler>, Arc<MemoryStore>) {
    let snapshot = SessionSnapshot::new(
        ScoreState::new(score, 7.5),
        StreakState::new(streak, None),
        WeaknessRegistry::new(),
    );
    let scheduler = Arc::new(VirtualScheduler::default());
    let store = Arc::new(MemoryStore::new());
    let session = Session::new(
        snapshot,
        SessionConfig::default(),
        scheduler.clone(),
        store.clone(),
    );
    (session, scheduler, store)
}

fn mock_test_result() -> AssessmentResult {
    AssessmentResult {
        correct_count: 1,
        total_count: 8,
        derived_score: 4.5,
        derived_weaknesses: vec![
            WeaknessRecord::new(1, "Match Headings", Skill::Reading, Impact::High),
            WeaknessRecord::new(2, "Map Labelling", Skill::Listening, Impact::Medium),
        ],
    }
}

fn topics(session: &Session) -> Vec<String> {
    session
        .weaknesses()
        .into_iter()
        .map(|w| w.topic)
        .collect()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    events
}

// --- Scenarios ---

#[test]
fn scenario_a_mock_test_enters_feedback() {
    let (session, _scheduler, store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();

    assert_eq!(session.score().current(), 4.5);
    assert_eq!(topics(&session), ["Match Headings", "Map Labelling"]);
    assert_eq!(session.overlay(), OverlayState::Feedback);
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.latest().unwrap().score.current(), 4.5);
}

#[test]
fn scenario_b_repair_clears_topic() {
    let (session, scheduler, _store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();
    let mut events = session.subscribe();

    session.start_repair(Some("Match Headings")).unwrap();
    assert_eq!(session.overlay(), OverlayState::Repair);

    scheduler.advance(Duration::from_millis(2499));
    assert_eq!(session.score().current(), 4.5);
    assert_eq!(session.overlay(), OverlayState::Repair);

    scheduler.advance(Duration::from_millis(1));
    assert_eq!(topics(&session), ["Map Labelling"]);
    assert_eq!(session.score().current(), 4.6);
    assert_eq!(session.overlay(), OverlayState::None);

    let notifications = session.active_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "+0.1 Band");
    assert_eq!(notifications[0].subtitle, "Match Headings Cleared");

    let completed = drain(&mut events)
        .into_iter()
        .any(|e| matches!(e, SessionEvent::WorkflowCompleted { .. }));
    assert!(completed);
}

#[test]
fn scenario_c_idle_decay() {
    let (session, _scheduler, store) = start(5.4, 28);
    let outcome = session.trigger_decay_by(0.05).unwrap();

    assert_eq!(outcome, DecayOutcome::Applied { from: 5.4, to: 5.35 });
    assert_eq!(session.score().current(), 5.35);
    assert!(session.score().is_decayed());
    assert!(store.latest().unwrap().score.is_decayed());
}

#[test]
fn scenario_d_daily_mix_clears_decay() {
    let (session, scheduler, _store) = start(5.4, 28);
    session.trigger_decay();
    assert!(session.score().is_decayed());

    session.start_daily_mix("Vocab").unwrap();
    scheduler.advance(Duration::from_millis(2000));

    assert_eq!(session.score().current(), 5.4);
    assert!(!session.score().is_decayed());
    let notifications = session.active_notifications();
    assert_eq!(notifications[0].title, "+0.05 Band");
    assert_eq!(notifications[0].subtitle, "Vocab Completed");
}

#[test]
fn scenario_e_second_start_is_busy() {
    let (session, scheduler, _store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();
    session.start_repair(Some("Match Headings")).unwrap();

    let err = session.start_repair(Some("Map Labelling")).unwrap_err();
    assert_eq!(
        err,
        SessionError::WorkflowBusy {
            active: OverlayState::Repair
        }
    );
    assert!(err.is_recoverable());

    scheduler.advance(Duration::from_millis(5000));
    assert_eq!(topics(&session), ["Map Labelling"]);
    assert_eq!(session.score().current(), 4.6);
    assert_eq!(session.active_notifications().len(), 1);
}

// --- Properties ---

#[test]
fn busy_start_leaves_state_unchanged() {
    let (session, scheduler, store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();
    session.start_recording().unwrap();
    scheduler.advance(Duration::from_millis(100));

    let before = session.snapshot();
    let saves = store.save_count();
    let progress = session.recording_progress();

    assert!(session.start_repair(Some("Match Headings")).is_err());
    assert!(session.start_daily_mix("Vocab").is_err());
    assert!(session.start_recording().is_err());
    assert!(session.ingest_mock_test(&mock_test_result()).is_err());

    assert_eq!(session.snapshot(), before);
    assert_eq!(store.save_count(), saves);
    assert_eq!(session.recording_progress(), progress);
    assert_eq!(session.overlay(), OverlayState::Recording);
}

#[test]
fn decay_rejected_outside_idle() {
    let (session, scheduler, _store) = start(5.4, 28);

    session.ingest_mock_test(&mock_test_result()).unwrap();
    assert_eq!(
        session.trigger_decay(),
        DecayOutcome::Rejected {
            state: OverlayState::Feedback
        }
    );

    session.start_repair(None).unwrap();
    assert!(!session.trigger_decay().is_applied());

    session.close_overlay();
    session.start_recording().unwrap();
    assert!(!session.trigger_decay().is_applied());
    assert_eq!(session.score().current(), 4.5);
    assert!(!session.score().is_decayed());

    scheduler.advance(Duration::from_secs(5));
    assert_eq!(session.overlay(), OverlayState::None);
    assert!(session.trigger_decay().is_applied());
}

#[test]
fn every_completion_clears_decay() {
    let (session, scheduler, _store) = start(6.0, 0);

    session.trigger_decay();
    session.start_repair(None).unwrap();
    scheduler.advance(Duration::from_millis(2500));
    assert!(!session.score().is_decayed());

    session.trigger_decay();
    session.start_recording().unwrap();
    scheduler.advance(Duration::from_millis(100));
    session.stop_recording().unwrap();
    assert!(!session.score().is_decayed());
}

#[test]
fn untargeted_repair_uses_generic_label() {
    let (session, scheduler, _store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();
    session.start_repair(None).unwrap();
    scheduler.advance(Duration::from_millis(2500));

    assert_eq!(session.weaknesses().len(), 2);
    assert_eq!(session.active_notifications()[0].subtitle, "Weakness Cleared");
}

#[test]
fn unknown_target_still_boosts() {
    let (session, scheduler, _store) = start(5.4, 28);
    session.start_repair(Some("Sentence Completion")).unwrap();
    scheduler.advance(Duration::from_millis(2500));

    assert_eq!(session.score().current(), 5.5);
    assert_eq!(
        session.active_notifications()[0].subtitle,
        "Sentence Completion Cleared"
    );
}

#[test]
fn boost_saturates_at_max_band() {
    let (session, scheduler, _store) = start(8.95, 0);
    session.start_repair(None).unwrap();
    scheduler.advance(Duration::from_millis(2500));
    assert_eq!(session.score().current(), 9.0);
}

#[test]
fn invalid_assessment_changes_nothing() {
    let (session, _scheduler, store) = start(5.4, 28);
    let mut result = mock_test_result();
    result.total_count = 0;

    let err = session.ingest_mock_test(&result).unwrap_err();
    assert!(matches!(err, SessionError::InvalidAssessment { .. }));
    assert!(!err.is_recoverable());
    assert_eq!(session.score().current(), 5.4);
    assert!(session.weaknesses().is_empty());
    assert_eq!(session.overlay(), OverlayState::None);
    assert_eq!(store.save_count(), 0);
}

#[test]
fn feedback_can_be_replaced_by_new_feedback() {
    let (session, _scheduler, _store) = start(5.4, 28);
    session.ingest_mock_test(&mock_test_result()).unwrap();

    let mut second = mock_test_result();
    second.derived_score = 5.0;
    second.derived_weaknesses.truncate(1);
    session.ingest_mock_test(&second).unwrap();

    assert_eq!(session.score().current(), 5.0);
    assert_eq!(topics(&session), ["Match Headings"]);
    assert_eq!(session.overlay(), OverlayState::Feedback);
}

#[test]
fn event_order_on_completion() {
    let (session, scheduler, _store) = start(5.4, 28);
    let mut events = session.subscribe();
    session.start_daily_mix("Vocab").unwrap();
    scheduler.advance(Duration::from_millis(2000));

    let events = drain(&mut events);
    assert!(matches!(
        events.first(),
        Some(SessionEvent::OverlayChanged {
            from: OverlayState::None,
            to: OverlayState::Repair
        })
    ));
    assert!(matches!(
        events.last(),
        Some(SessionEvent::WorkflowCompleted { .. })
    ));
    assert!(events.contains(&SessionEvent::ScoreChanged {
        score: 5.45,
        decayed: false
    }));
}

// --- Persistence ---

#[test]
fn session_resumes_from_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("session.json");
    let scheduler = Arc::new(VirtualScheduler::default());

    {
        let store = Arc::new(JsonFileStore::new(&path));
        let session = Session::open(
            SessionSnapshot::default(),
            SessionConfig::default(),
            scheduler.clone(),
            store,
        )
        .unwrap();
        session.ingest_mock_test(&mock_test_result()).unwrap();
        session.start_repair(Some("Map Labelling")).unwrap();
        scheduler.advance(Duration::from_millis(2500));
    }

    let store = Arc::new(JsonFileStore::new(&path));
    let saved = store.load().unwrap().unwrap();
    assert!(saved.saved_at.is_some());

    let session = Session::open(
        SessionSnapshot::default(),
        SessionConfig::default(),
        scheduler,
        store,
    )
    .unwrap();
    assert_eq!(session.score().current(), 4.6);
    assert_eq!(topics(&session), ["Match Headings"]);
    assert_eq!(session.overlay(), OverlayState::None);
}

#[tokio::test]
async fn mock_service_feeds_intake() {
    use bandcoach_core::mock::MockAssessmentService;

    let (session, _scheduler, _store) = start(5.4, 28);
    let service = MockAssessmentService::new([mock_test_result()]);

    session.run_mock_test(&service).await.unwrap();
    assert_eq!(session.score().current(), 4.5);

    session.close_overlay();
    let err = session.run_mock_test(&service).await.unwrap_err();
    assert!(format!("{err:#}").contains("assessment service 'mock' failed"));
    assert_eq!(service.call_count(), 2);
    assert_eq!(session.score().current(), 4.5);
}

#[tokio::test]
async fn speech_evaluator_finishes_recording() {
    use bandcoach_core::mock::MockSpeechEvaluator;

    let (session, scheduler, _store) = start(5.4, 28);
    let evaluator = MockSpeechEvaluator::with_delta(0.25, "Pronunciation improved");

    assert!(session.evaluate_recording(&evaluator).await.is_err());
    assert_eq!(evaluator.call_count(), 0);

    session.start_recording().unwrap();
    scheduler.advance(Duration::from_millis(500));
    let notification = session.evaluate_recording(&evaluator).await.unwrap();

    assert_eq!(notification.title, "+0.25 Band");
    assert_eq!(session.score().current(), 5.65);
    assert_eq!(session.overlay(), OverlayState::None);
}
