mod support;

use std::sync::{Arc, Mutex};

use drafter_core::{
    DraftError, DraftOptions, GenerationRequest, InvalidRequest, RunnerStatus, Tone,
    UNKNOWN_SUBJECT,
};
use drafter_engine::{JobRunner, Session};
use support::{done, failed, fixture, init_logging, running, FakeAuth, FakeDirectory, FakeMail, ScriptedBackend};

fn request(thread_id: &str) -> GenerationRequest {
    GenerationRequest::new(thread_id, Tone::Friendly, 150, false).unwrap()
}

#[tokio::test(start_paused = true)]
async fn single_run_walks_idle_running_done_and_records_history() {
    init_logging();
    let fx = fixture(true);
    fx.backend
        .script("t1", [running(), running(), done("Thanks for...")]);

    let runner = JobRunner::new(&fx.session);
    let observer = runner.observer();
    let statuses = Arc::new(Mutex::new(vec![runner.status()]));
    {
        let statuses = statuses.clone();
        fx.backend
            .on_poll(move |_| statuses.lock().unwrap().push(observer.status()));
    }

    let result = runner.run(request("t1")).await.unwrap();
    statuses.lock().unwrap().push(runner.status());

    let mut seen = statuses.lock().unwrap().clone();
    seen.dedup();
    assert_eq!(
        seen,
        vec![RunnerStatus::Idle, RunnerStatus::Running, RunnerStatus::Done]
    );
    assert_eq!(result.text, "Thanks for...");

    let snapshot = runner.snapshot();
    assert_eq!(snapshot.result().map(|r| r.text.as_str()), Some("Thanks for..."));
    assert_eq!(snapshot.job_id().map(|id| id.as_str()), Some("j1"));

    let history = fx.session.history().list();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "Thanks for...");
    assert_eq!(history[0].thread_subject, "Q3 Planning");
    assert_eq!(history[0].thread_id, "t1");
}

#[tokio::test(start_paused = true)]
async fn job_failure_is_retained_without_history() {
    let fx = fixture(true);
    fx.backend.script("t1", [running(), failed("model overloaded")]);
    let runner = JobRunner::new(&fx.session);

    let err = runner.run(request("t1")).await.unwrap_err();

    assert_eq!(err, DraftError::JobFailed("model overloaded".into()));
    assert_eq!(runner.status(), RunnerStatus::Error);
    let snapshot = runner.snapshot();
    assert_eq!(snapshot.error(), Some(&err));
    assert!(snapshot.result().is_none());
    assert!(fx.session.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_thread_id_never_reaches_the_backend() {
    let fx = fixture(true);
    let runner = JobRunner::new(&fx.session);

    let err = runner
        .run_thread("  ", &DraftOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, DraftError::InvalidRequest(InvalidRequest::MissingThreadId));
    assert_eq!(runner.status(), RunnerStatus::Error);
    assert!(fx.backend.submitted().is_empty());
    assert_eq!(fx.backend.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unauthorized_session_fails_fast() {
    let fx = fixture(false);
    fx.backend.script("t1", [done("unused")]);
    let runner = JobRunner::new(&fx.session);

    let err = runner.run(request("t1")).await.unwrap_err();

    assert_eq!(err, DraftError::Unauthorized);
    assert!(err.needs_reconnect());
    assert!(fx.backend.submitted().is_empty());
    assert_eq!(runner.status(), RunnerStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn submit_failure_surfaces_as_remote() {
    let fx = fixture(true);
    fx.backend
        .fail_submit("t1", DraftError::remote(Some(400), "meta.threadId is required"));
    let runner = JobRunner::new(&fx.session);

    let err = runner.run(request("t1")).await.unwrap_err();

    assert_eq!(
        err,
        DraftError::remote(Some(400), "meta.threadId is required")
    );
    assert_eq!(fx.backend.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_run_while_running_is_rejected() {
    let fx = fixture(true);
    fx.backend.script("t1", [running(), running(), done("first")]);
    let runner = JobRunner::new(&fx.session);

    let (first, second) = tokio::join!(runner.run(request("t1")), async {
        tokio::task::yield_now().await;
        runner.run(request("t2")).await
    });

    assert_eq!(first.unwrap().text, "first");
    assert_eq!(second.unwrap_err(), DraftError::Busy);
    assert_eq!(fx.backend.submitted_threads(), vec!["t1".to_string()]);
    assert_eq!(runner.status(), RunnerStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn timeout_leaves_runner_in_error_not_running() {
    let fx = fixture(true);
    fx.backend.script("t1", [running()]);
    let runner = JobRunner::new(&fx.session).with_poll_settings(
        drafter_engine::PollSettings::new(std::time::Duration::from_millis(800), 3),
    );

    let err = runner.run(request("t1")).await.unwrap_err();

    assert_eq!(err, DraftError::Timeout { attempts: 3 });
    assert_eq!(runner.status(), RunnerStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn regenerate_reuses_last_request_and_prepends_history() {
    let fx = fixture(true);
    fx.backend.script("t2", [done("v1")]);
    let runner = JobRunner::new(&fx.session);

    assert_eq!(
        runner.regenerate().await.unwrap_err(),
        DraftError::InvalidRequest(InvalidRequest::NothingToRegenerate)
    );

    let options = DraftOptions {
        tone: Tone::Formal,
        length: 200,
        use_bullets: true,
        input: "confirm Tuesday 3pm".into(),
    };
    runner.run_thread("t2", &options).await.unwrap();
    fx.backend.script("t2", [done("v2")]);
    runner.regenerate().await.unwrap();

    let submitted = fx.backend.submitted();
    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0], submitted[1]);
    assert_eq!(submitted[1].tone(), Tone::Formal);
    assert_eq!(submitted[1].input(), "confirm Tuesday 3pm");

    let texts: Vec<_> = fx
        .session
        .history()
        .list()
        .into_iter()
        .map(|entry| entry.text)
        .collect();
    assert_eq!(texts, vec!["v2", "v1"]);
    assert_eq!(runner.snapshot().messages().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn subject_lookup_failure_falls_back_to_unknown() {
    let backend = ScriptedBackend::new();
    backend.script("t1", [done("hello")]);
    let session = Session::new(
        backend.clone(),
        FakeDirectory::failing(),
        FakeAuth::connected(true),
        FakeMail::new(),
    );
    let runner = JobRunner::new(&session);

    runner.run(request("t1")).await.unwrap();

    assert_eq!(
        session.history().latest().unwrap().thread_subject,
        UNKNOWN_SUBJECT
    );
}

#[tokio::test(start_paused = true)]
async fn dropped_run_returns_runner_to_idle() {
    let fx = fixture(true);
    fx.backend.script("t1", [running()]);
    let runner = JobRunner::new(&fx.session);

    let outcome = tokio::time::timeout(
        std::time::Duration::from_millis(1000),
        runner.run(request("t1")),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(runner.status(), RunnerStatus::Idle);
    fx.backend.script("t1", [done("after abandon")]);
    assert_eq!(runner.run(request("t1")).await.unwrap().text, "after abandon");
}
