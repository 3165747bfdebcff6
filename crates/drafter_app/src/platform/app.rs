use std::io;

use anyhow::{anyhow, Context, Result};
use drafter_core::{
    BatchRun, DraftError, DraftHistoryEntry, DraftOptions, DraftResult, JobStatus, ThreadId,
};
use drafter_engine::{AuthState, BatchEvent, EngineEvent, EngineHandle, SendReceipt, Session};
use drafter_logging::{drafter_info, drafter_warn, level_for_verbosity};

use super::config::DrafterConfig;
use super::editor::{DraftActions, Editor, EditorOutcome};
use super::logging;
use crate::cli::{Cli, Command};

pub fn run(cli: Cli) -> Result<()> {
    let config = DrafterConfig::load(cli.config.as_deref()).context("loading configuration")?;
    logging::initialize(config.log_destination, level_for_verbosity(cli.verbose));
    match &config.source {
        Some(path) => drafter_info!("loaded config from {:?}", path),
        None => drafter_info!("no config file; using defaults"),
    }
    drafter_info!(
        "drafter starting against {} (project {})",
        config.base_url,
        config.project_id
    );

    let mut engine_config = config.engine_config();
    if let Command::Batch {
        concurrency: Some(concurrency),
        ..
    } = &cli.command
    {
        engine_config.batch_concurrency = *concurrency;
    }
    let session =
        Session::over_http(config.http_settings()).context("setting up the backend client")?;
    let engine = EngineHandle::new(session, engine_config).context("starting the engine")?;

    match cli.command {
        Command::Threads => list_threads(&engine),
        Command::Draft {
            thread_id,
            options,
            no_edit,
        } => draft(&engine, thread_id, options.into(), no_edit),
        Command::Batch {
            thread_ids,
            options,
            ..
        } => batch(&engine, thread_ids, options.into()),
        Command::Auth { redirect_to } => auth(&engine, redirect_to),
        Command::Send { thread_id, text } => {
            engine.send_draft(thread_id, text);
            let receipt = wait_for(&engine, |event| match event {
                EngineEvent::SendFinished(result) => Some(result),
                _ => None,
            })
            .and_then(|result| explain(result, "sending the draft"))?;
            print_receipt(&receipt);
            Ok(())
        }
    }
}

fn list_threads(engine: &EngineHandle) -> Result<()> {
    engine.list_threads();
    let threads = wait_for(engine, |event| match event {
        EngineEvent::ThreadsListed(result) => Some(result),
        _ => None,
    })
    .and_then(|result| explain(result, "listing threads"))?;

    if threads.is_empty() {
        println!("no threads");
    }
    for thread in threads {
        println!(
            "{}\t{}\t{}\t{}",
            thread.id, thread.date, thread.from, thread.subject
        );
    }
    Ok(())
}

fn draft(
    engine: &EngineHandle,
    thread_id: ThreadId,
    options: DraftOptions,
    no_edit: bool,
) -> Result<()> {
    engine.run_draft(thread_id.clone(), options);
    let result = wait_for(engine, draft_finished)
        .and_then(|result| explain(result, "generating the draft"))?;

    if no_edit {
        println!("{}", result.text);
    } else {
        let actions = EngineActions {
            engine,
            thread_id: thread_id.clone(),
        };
        let stdin = io::stdin();
        match Editor::new(stdin.lock(), io::stdout(), actions).run(result.text)? {
            EditorOutcome::Sent(receipt) => print_receipt(&receipt),
            EditorOutcome::Closed { text } => drafter_info!(
                "editor closed without sending ({} chars unsent)",
                text.chars().count()
            ),
        }
    }
    print_history(&engine.history());
    Ok(())
}

fn batch(engine: &EngineHandle, thread_ids: Vec<ThreadId>, options: DraftOptions) -> Result<()> {
    engine.run_batch(thread_ids, options);
    let run = wait_for(engine, |event| match event {
        EngineEvent::Batch(progress) => {
            print_batch_event(&progress);
            None
        }
        EngineEvent::BatchFinished(result) => Some(result),
        _ => None,
    })
    .and_then(|result| explain(result, "running the batch"))?;

    print_batch_results(&run);
    print_history(&engine.history());
    Ok(())
}

fn auth(engine: &EngineHandle, redirect_to: Option<String>) -> Result<()> {
    engine.check_auth(redirect_to);
    let state = wait_for(engine, |event| match event {
        EngineEvent::AuthChecked(result) => Some(result),
        _ => None,
    })
    .and_then(|result| explain(result, "checking the mail connection"))?;

    match state {
        AuthState::Connected => println!("mail account connected"),
        AuthState::Disconnected {
            authorization_url: Some(url),
        } => println!("mail account not connected; open this URL to connect:\n{url}"),
        AuthState::Disconnected {
            authorization_url: None,
        } => println!("mail account not connected and no authorization URL was offered"),
    }
    Ok(())
}

/// Adapts the engine's request/event pairs to the editor's blocking calls.
struct EngineActions<'a> {
    engine: &'a EngineHandle,
    thread_id: ThreadId,
}

impl DraftActions for EngineActions<'_> {
    fn regenerate(&mut self) -> Result<String, DraftError> {
        self.engine.regenerate();
        wait_for(self.engine, draft_finished)
            .map_err(engine_gone)?
            .map(|result| result.text)
    }

    fn send(&mut self, text: &str) -> Result<SendReceipt, DraftError> {
        self.engine.send_draft(self.thread_id.clone(), text);
        wait_for(self.engine, |event| match event {
            EngineEvent::SendFinished(result) => Some(result),
            _ => None,
        })
        .map_err(engine_gone)?
    }
}

fn draft_finished(event: EngineEvent) -> Option<Result<DraftResult, DraftError>> {
    match event {
        EngineEvent::DraftFinished(result) => Some(result),
        _ => None,
    }
}

/// Blocks until `pick` accepts an event. Events it declines are dropped.
fn wait_for<T>(
    engine: &EngineHandle,
    mut pick: impl FnMut(EngineEvent) -> Option<T>,
) -> Result<T> {
    while let Some(event) = engine.recv() {
        if let Some(value) = pick(event) {
            return Ok(value);
        }
    }
    Err(anyhow!("the engine stopped before answering"))
}

fn engine_gone(err: anyhow::Error) -> DraftError {
    DraftError::remote(None, err.to_string())
}

fn explain<T>(result: Result<T, DraftError>, what: &'static str) -> Result<T> {
    result.map_err(|err| {
        if err.needs_reconnect() {
            drafter_warn!("{what}: mail account needs reconnecting");
            anyhow!(err).context(format!("{what}; run `drafter auth` to reconnect"))
        } else {
            anyhow!(err).context(what)
        }
    })
}

fn print_receipt(receipt: &SendReceipt) {
    match &receipt.message_id {
        Some(id) => println!("sent reply on thread {} (message {id})", receipt.thread_id),
        None => println!("sent reply on thread {}", receipt.thread_id),
    }
}

fn print_batch_event(event: &BatchEvent) {
    match event {
        BatchEvent::Started { total } => println!("drafting {total} threads"),
        BatchEvent::ItemStatus {
            thread_id,
            status,
            message: Some(message),
        } => println!("[{status}] {thread_id}: {message}"),
        BatchEvent::ItemStatus {
            thread_id, status, ..
        } => println!("[{status}] {thread_id}"),
        BatchEvent::Finished { summary } => println!(
            "{} done, {} failed, {} total",
            summary.completed, summary.failed, summary.total
        ),
    }
}

fn print_batch_results(run: &BatchRun) {
    for (thread_id, status) in run.statuses() {
        if status != JobStatus::Done {
            continue;
        }
        if let Some(result) = run.result(&thread_id) {
            println!("==== {thread_id}\n{}", result.text);
        }
    }
}

fn print_history(history: &[DraftHistoryEntry]) {
    if history.is_empty() {
        return;
    }
    println!("history (newest first):");
    for entry in history {
        println!(
            "  {}  {}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.thread_id,
            entry.thread_subject
        );
    }
}
