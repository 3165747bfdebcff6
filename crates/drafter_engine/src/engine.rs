use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use drafter_core::{
    BatchRun, DraftError, DraftHistoryEntry, DraftOptions, DraftResult, RunnerState, ThreadId,
    ThreadSummary,
};
use drafter_logging::{drafter_debug, drafter_info};

use crate::backend::SendReceipt;
use crate::{
    BatchCoordinator, BatchEvent, BatchSink, EngineConfig, JobRunner, RunnerObserver, Session,
};

enum EngineCommand {
    RunDraft {
        thread_id: ThreadId,
        options: DraftOptions,
    },
    Regenerate,
    RunBatch {
        thread_ids: Vec<ThreadId>,
        options: DraftOptions,
    },
    Send {
        thread_id: ThreadId,
        text: String,
    },
    ListThreads,
    CheckAuth {
        redirect_to: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Connected,
    Disconnected { authorization_url: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    DraftFinished(Result<DraftResult, DraftError>),
    Batch(BatchEvent),
    BatchFinished(Result<BatchRun, DraftError>),
    SendFinished(Result<SendReceipt, DraftError>),
    ThreadsListed(Result<Vec<ThreadSummary>, DraftError>),
    AuthChecked(Result<AuthState, DraftError>),
}

/// Runs the async engine on a background thread and talks to it over channels.
///
/// One handle owns one job runner, so a second draft submitted while the first
/// is still in flight comes back as `Busy`.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    runner: RunnerObserver,
    session: Session,
}

struct Worker {
    session: Session,
    runner: JobRunner,
    config: EngineConfig,
}

impl EngineHandle {
    pub fn new(session: Session, config: EngineConfig) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("drafter-engine")
            .build()?;

        let runner = JobRunner::new(&session).with_poll_settings(config.interactive_poll);
        let observer = runner.observer();
        let worker = Arc::new(Worker {
            session: session.clone(),
            runner,
            config,
        });

        thread::Builder::new()
            .name("drafter-engine-dispatch".to_string())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let worker = worker.clone();
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        worker.handle(command, event_tx).await;
                    });
                }
                drafter_debug!("engine command channel closed");
            })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            runner: observer,
            session,
        })
    }

    pub fn run_draft(&self, thread_id: impl Into<ThreadId>, options: DraftOptions) {
        self.send_command(EngineCommand::RunDraft {
            thread_id: thread_id.into(),
            options,
        });
    }

    pub fn regenerate(&self) {
        self.send_command(EngineCommand::Regenerate);
    }

    pub fn run_batch(&self, thread_ids: Vec<ThreadId>, options: DraftOptions) {
        self.send_command(EngineCommand::RunBatch {
            thread_ids,
            options,
        });
    }

    pub fn send_draft(&self, thread_id: impl Into<ThreadId>, text: impl Into<String>) {
        self.send_command(EngineCommand::Send {
            thread_id: thread_id.into(),
            text: text.into(),
        });
    }

    pub fn list_threads(&self) {
        self.send_command(EngineCommand::ListThreads);
    }

    pub fn check_auth(&self, redirect_to: Option<String>) {
        self.send_command(EngineCommand::CheckAuth { redirect_to });
    }

    pub fn runner_state(&self) -> RunnerState {
        self.runner.snapshot()
    }

    pub fn history(&self) -> Vec<DraftHistoryEntry> {
        self.session.history().list()
    }

    /// Blocks for the next event; `None` once the engine has shut down.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    fn send_command(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

struct ChannelBatchSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl BatchSink for ChannelBatchSink {
    fn emit(&self, event: BatchEvent) {
        let _ = self.tx.send(EngineEvent::Batch(event));
    }
}

impl Worker {
    async fn handle(&self, command: EngineCommand, event_tx: mpsc::Sender<EngineEvent>) {
        let event = match command {
            EngineCommand::RunDraft { thread_id, options } => {
                EngineEvent::DraftFinished(self.runner.run_thread(&thread_id, &options).await)
            }
            EngineCommand::Regenerate => EngineEvent::DraftFinished(self.runner.regenerate().await),
            EngineCommand::RunBatch {
                thread_ids,
                options,
            } => {
                let coordinator = BatchCoordinator::new(&self.session)
                    .with_poll_settings(self.config.batch_poll)
                    .with_concurrency(self.config.batch_concurrency);
                let sink = ChannelBatchSink {
                    tx: event_tx.clone(),
                };
                EngineEvent::BatchFinished(coordinator.run_batch(thread_ids, &options, &sink).await)
            }
            EngineCommand::Send { thread_id, text } => {
                EngineEvent::SendFinished(self.session.send_draft(&thread_id, &text).await)
            }
            EngineCommand::ListThreads => {
                EngineEvent::ThreadsListed(self.session.threads().list_threads().await)
            }
            EngineCommand::CheckAuth { redirect_to } => {
                EngineEvent::AuthChecked(self.check_auth(redirect_to.as_deref()).await)
            }
        };
        drafter_info!("engine event ready: {}", describe(&event));
        let _ = event_tx.send(event);
    }

    async fn check_auth(&self, redirect_to: Option<&str>) -> Result<AuthState, DraftError> {
        let auth = self.session.auth();
        if auth.is_connected().await? {
            return Ok(AuthState::Connected);
        }
        let authorization_url = auth.authorization_url(redirect_to).await.ok();
        Ok(AuthState::Disconnected { authorization_url })
    }
}

fn describe(event: &EngineEvent) -> &'static str {
    match event {
        EngineEvent::DraftFinished(Ok(_)) => "draft done",
        EngineEvent::DraftFinished(Err(_)) => "draft failed",
        EngineEvent::Batch(_) => "batch progress",
        EngineEvent::BatchFinished(_) => "batch finished",
        EngineEvent::SendFinished(Ok(_)) => "send done",
        EngineEvent::SendFinished(Err(_)) => "send failed",
        EngineEvent::ThreadsListed(_) => "threads listed",
        EngineEvent::AuthChecked(_) => "auth checked",
    }
}
