use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, StreamExt};

use drafter_core::{
    BatchRun, BatchSummary, DraftError, DraftOptions, DraftResult, JobStatus, ThreadId,
    TransitionError,
};
use drafter_logging::{drafter_error, drafter_info, drafter_warn};

use crate::{PollSettings, PollingScheduler, Session, MAX_BATCH_CONCURRENCY};

#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemStatus {
        thread_id: ThreadId,
        status: JobStatus,
        message: Option<String>,
    },
    Finished {
        summary: BatchSummary,
    },
}

pub trait BatchSink: Send + Sync {
    fn emit(&self, event: BatchEvent);
}

/// Sink for callers that only want the final `BatchRun`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBatchSink;

impl BatchSink for NullBatchSink {
    fn emit(&self, _event: BatchEvent) {}
}

/// Snapshot access to the run a coordinator is working on.
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    run: Arc<Mutex<Option<BatchRun>>>,
}

impl BatchProgress {
    /// Copy of the current run; `None` before the first batch starts.
    pub fn snapshot(&self) -> Option<BatchRun> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BatchRun>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, run: BatchRun) {
        *self.lock() = Some(run);
    }

    fn update(
        &self,
        f: impl FnOnce(&mut BatchRun) -> Result<(), TransitionError>,
    ) -> Result<(), TransitionError> {
        match self.lock().as_mut() {
            Some(run) => f(run),
            None => Ok(()),
        }
    }
}

/// Runs one draft job per thread and keeps an item-by-item status map.
///
/// Items start in input order. With the default concurrency of 1 each job is
/// fully resolved before the next is submitted, which keeps backend load
/// predictable. A failed item is recorded and the loop moves on. One
/// coordinator runs one batch at a time; overlapping calls get `Busy`.
pub struct BatchCoordinator {
    session: Session,
    settings: PollSettings,
    concurrency: usize,
    progress: BatchProgress,
    in_flight: AtomicBool,
}

impl BatchCoordinator {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            settings: PollSettings::batch(),
            concurrency: 1,
            progress: BatchProgress::default(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Jobs allowed in flight at once, clamped to `1..=MAX_BATCH_CONCURRENCY`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_BATCH_CONCURRENCY);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn progress(&self) -> BatchProgress {
        self.progress.clone()
    }

    pub async fn run_batch<I, S>(
        &self,
        thread_ids: I,
        options: &DraftOptions,
        sink: &dyn BatchSink,
    ) -> Result<BatchRun, DraftError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ThreadId>,
    {
        let run = BatchRun::new(thread_ids)?;
        options.validate()?;
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            drafter_warn!("batch rejected: another batch is still running");
            return Err(DraftError::Busy);
        }
        let _in_flight = InFlightGuard(&self.in_flight);
        self.session.ensure_authorized().await?;

        let items = run.items().to_vec();
        drafter_info!(
            "starting batch of {} threads (concurrency {})",
            items.len(),
            self.concurrency
        );
        self.progress.replace(run);
        sink.emit(BatchEvent::Started { total: items.len() });

        stream::iter(items)
            .map(|thread_id| self.process_item(thread_id, options, sink))
            .buffer_unordered(self.concurrency)
            .collect::<Vec<()>>()
            .await;

        let run = self
            .progress
            .snapshot()
            .ok_or_else(|| DraftError::remote(None, "batch state went missing"))?;
        let summary = run.summary();
        drafter_info!(
            "batch finished: {} done, {} failed of {}",
            summary.completed,
            summary.failed,
            summary.total
        );
        sink.emit(BatchEvent::Finished { summary });
        Ok(run)
    }

    async fn process_item(&self, thread_id: ThreadId, options: &DraftOptions, sink: &dyn BatchSink) {
        self.transition(&thread_id, |run| run.mark_running(&thread_id));
        sink.emit(BatchEvent::ItemStatus {
            thread_id: thread_id.clone(),
            status: JobStatus::Running,
            message: None,
        });

        match self.generate(&thread_id, options).await {
            Ok(result) => {
                self.session.record_success(&thread_id, &result).await;
                self.transition(&thread_id, |run| run.mark_done(&thread_id, result));
                sink.emit(BatchEvent::ItemStatus {
                    thread_id,
                    status: JobStatus::Done,
                    message: None,
                });
            }
            Err(err) => {
                drafter_warn!("batch item {} failed ({}): {}", thread_id, err.kind(), err);
                let message = err.to_string();
                self.transition(&thread_id, |run| run.mark_failed(&thread_id, message.clone()));
                sink.emit(BatchEvent::ItemStatus {
                    thread_id,
                    status: JobStatus::Error,
                    message: Some(message),
                });
            }
        }
    }

    async fn generate(
        &self,
        thread_id: &str,
        options: &DraftOptions,
    ) -> Result<DraftResult, DraftError> {
        let request = options.request_for(thread_id)?;
        let backend = self.session.backend();
        let job_id = backend.submit(&request).await?;
        PollingScheduler::new(backend, self.settings)
            .await_completion(&job_id)
            .await
    }

    fn transition(
        &self,
        thread_id: &str,
        f: impl FnOnce(&mut BatchRun) -> Result<(), TransitionError>,
    ) {
        if let Err(err) = self.progress.update(f) {
            drafter_error!("batch item {}: {}", thread_id, err);
        }
    }
}

/// Clears the coordinator's in-flight flag when a run ends or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
