mod support;

use std::time::Duration;

use drafter_core::{DraftError, DraftOptions, JobStatus, RunnerStatus};
use drafter_engine::{
    AuthState, BatchEvent, EngineConfig, EngineEvent, EngineHandle, PollSettings,
};
use support::{done, failed, fixture, init_logging, running, Fixture};

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> EngineConfig {
    EngineConfig {
        interactive_poll: PollSettings::new(Duration::from_millis(5), 20),
        batch_poll: PollSettings::new(Duration::from_millis(5), 20),
        batch_concurrency: 1,
    }
}

fn start(connected: bool) -> (Fixture, EngineHandle) {
    init_logging();
    let fx = fixture(connected);
    let engine = EngineHandle::new(fx.session.clone(), fast_config()).unwrap();
    (fx, engine)
}

/// Next event that is not batch progress.
fn next_final(engine: &EngineHandle) -> EngineEvent {
    loop {
        match engine.recv_timeout(WAIT) {
            Some(EngineEvent::Batch(_)) => continue,
            Some(event) => return event,
            None => panic!("engine produced no event within {WAIT:?}"),
        }
    }
}

#[test]
fn draft_round_trip_updates_state_and_history() {
    let (fx, engine) = start(true);
    fx.backend.script("t1", [running(), done("Thanks for...")]);

    engine.run_draft("t1", DraftOptions::default());

    match next_final(&engine) {
        EngineEvent::DraftFinished(Ok(result)) => assert_eq!(result.text, "Thanks for..."),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(engine.runner_state().status(), RunnerStatus::Done);
    let history = engine.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].thread_subject, "Q3 Planning");
}

#[test]
fn regenerate_runs_the_last_request_again() {
    let (fx, engine) = start(true);
    fx.backend.script("t2", [done("first")]);
    engine.run_draft("t2", DraftOptions::default());
    assert!(matches!(next_final(&engine), EngineEvent::DraftFinished(Ok(_))));

    fx.backend.script("t2", [done("second")]);
    engine.regenerate();

    match next_final(&engine) {
        EngineEvent::DraftFinished(Ok(result)) => assert_eq!(result.text, "second"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(fx.backend.submitted_threads(), vec!["t2", "t2"]);
}

#[test]
fn batch_progress_is_forwarded_before_the_final_run() {
    let (fx, engine) = start(true);
    fx.backend.script("t1", [done("one")]);
    fx.backend.script("t2", [failed("rate limited")]);

    engine.run_batch(vec!["t1".into(), "t2".into()], DraftOptions::default());

    let mut progress = Vec::new();
    let run = loop {
        match engine.recv_timeout(WAIT) {
            Some(EngineEvent::Batch(event)) => progress.push(event),
            Some(EngineEvent::BatchFinished(run)) => break run.unwrap(),
            other => panic!("unexpected event {other:?}"),
        }
    };

    assert_eq!(progress.first(), Some(&BatchEvent::Started { total: 2 }));
    assert!(matches!(progress.last(), Some(BatchEvent::Finished { .. })));
    assert_eq!(run.status("t1"), Some(JobStatus::Done));
    assert_eq!(run.status("t2"), Some(JobStatus::Error));
}

#[test]
fn send_and_listing_go_through_the_session() {
    let (fx, engine) = start(true);

    engine.send_draft("t1", "See you Tuesday.");
    match next_final(&engine) {
        EngineEvent::SendFinished(Ok(receipt)) => assert_eq!(receipt.thread_id, "t1"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        fx.mail.sent(),
        vec![("t1".to_string(), "See you Tuesday.".to_string())]
    );

    engine.list_threads();
    match next_final(&engine) {
        EngineEvent::ThreadsListed(Ok(threads)) => assert_eq!(threads.len(), 3),
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn disconnected_account_reports_unauthorized_and_a_reconnect_url() {
    let (fx, engine) = start(false);

    engine.run_draft("t1", DraftOptions::default());
    assert_eq!(
        next_final(&engine),
        EngineEvent::DraftFinished(Err(DraftError::Unauthorized))
    );
    assert!(fx.backend.submitted().is_empty());

    engine.check_auth(None);
    assert_eq!(
        next_final(&engine),
        EngineEvent::AuthChecked(Ok(AuthState::Disconnected {
            authorization_url: Some("https://auth.example.com/connect".to_string()),
        }))
    );
}

#[test]
fn idle_engine_has_nothing_to_report() {
    let (_fx, engine) = start(true);
    assert!(engine.try_recv().is_none());
    assert_eq!(engine.runner_state().status(), RunnerStatus::Idle);
}
