use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use drafter_core::{
    DraftError, DraftOptions, DraftResult, GenerationRequest, InvalidRequest, RunnerState,
    RunnerStatus,
};
use drafter_logging::{drafter_info, drafter_warn};

use crate::{PollSettings, PollingScheduler, Session};

/// Read-only view onto a runner's state, for UIs watching a job in flight.
#[derive(Debug, Clone)]
pub struct RunnerObserver {
    state: Arc<Mutex<RunnerState>>,
}

impl RunnerObserver {
    pub fn snapshot(&self) -> RunnerState {
        lock(&self.state).clone()
    }

    pub fn status(&self) -> RunnerStatus {
        lock(&self.state).status()
    }
}

/// Drives one generation request at a time from submission to a terminal state.
pub struct JobRunner {
    session: Session,
    settings: PollSettings,
    state: Arc<Mutex<RunnerState>>,
}

impl JobRunner {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            settings: PollSettings::interactive(),
            state: Arc::new(Mutex::new(RunnerState::new())),
        }
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn observer(&self) -> RunnerObserver {
        RunnerObserver {
            state: self.state.clone(),
        }
    }

    pub fn snapshot(&self) -> RunnerState {
        lock(&self.state).clone()
    }

    pub fn status(&self) -> RunnerStatus {
        lock(&self.state).status()
    }

    /// Builds the request for `thread_id` and runs it. Invalid input is
    /// rejected here, before any collaborator is contacted.
    pub async fn run_thread(
        &self,
        thread_id: &str,
        options: &DraftOptions,
    ) -> Result<DraftResult, DraftError> {
        match options.request_for(thread_id) {
            Ok(request) => self.run(request).await,
            Err(invalid) => {
                let err = DraftError::from(invalid);
                let mut state = lock(&self.state);
                if state.status() != RunnerStatus::Running {
                    state.fail(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Runs `request` to completion. Rejected with `Busy` while another job
    /// from this runner is still in flight.
    pub async fn run(&self, request: GenerationRequest) -> Result<DraftResult, DraftError> {
        lock(&self.state).begin(request.clone())?;
        let mut guard = AbandonGuard {
            state: &self.state,
            armed: true,
        };

        let outcome = self.drive(&request).await;

        guard.armed = false;
        let mut state = lock(&self.state);
        match &outcome {
            Ok(result) => state.complete(result.clone()),
            Err(err) => {
                drafter_warn!(
                    "draft for thread {} failed ({}): {}",
                    request.thread_id(),
                    err.kind(),
                    err
                );
                state.fail(err.clone());
            }
        }
        outcome
    }

    /// Submits the previous request again.
    pub async fn regenerate(&self) -> Result<DraftResult, DraftError> {
        let request = lock(&self.state)
            .last_request()
            .cloned()
            .ok_or(InvalidRequest::NothingToRegenerate)?;
        self.run(request).await
    }

    async fn drive(&self, request: &GenerationRequest) -> Result<DraftResult, DraftError> {
        self.session.ensure_authorized().await?;

        let backend = self.session.backend();
        let job_id = backend.submit(request).await?;
        drafter_info!(
            "submitted draft for thread {} as job {}",
            request.thread_id(),
            job_id
        );
        lock(&self.state).set_job_id(job_id.clone());

        let scheduler = PollingScheduler::new(backend, self.settings);
        let result = scheduler.await_completion(&job_id).await?;

        self.session
            .record_success(request.thread_id(), &result)
            .await;
        Ok(result)
    }
}

/// Returns the runner to idle if the `run` future is dropped mid-job.
struct AbandonGuard<'a> {
    state: &'a Mutex<RunnerState>,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.state).abandon();
        }
    }
}

fn lock(state: &Mutex<RunnerState>) -> MutexGuard<'_, RunnerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
