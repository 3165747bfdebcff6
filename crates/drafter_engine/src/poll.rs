use std::sync::Arc;

use drafter_core::{DraftError, DraftResult, JobHandle, JobId, JobStatus};
use drafter_logging::{drafter_debug, drafter_info, drafter_warn};

use crate::backend::GenerationBackend;
use crate::PollSettings;

/// Polls one job at a time until it finishes or the attempt budget runs out.
///
/// Queries for a job never overlap: each poll is awaited before the next wait
/// starts. Giving up only stops this client from waiting; the remote job keeps
/// running.
#[derive(Clone)]
pub struct PollingScheduler {
    backend: Arc<dyn GenerationBackend>,
    settings: PollSettings,
}

impl PollingScheduler {
    pub fn new(backend: Arc<dyn GenerationBackend>, settings: PollSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub async fn await_completion(&self, job_id: &JobId) -> Result<DraftResult, DraftError> {
        self.await_completion_with(job_id, |_| {}).await
    }

    /// Like [`Self::await_completion`], calling `on_status` whenever the job's
    /// status changes.
    pub async fn await_completion_with<F>(
        &self,
        job_id: &JobId,
        mut on_status: F,
    ) -> Result<DraftResult, DraftError>
    where
        F: FnMut(JobStatus) + Send,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut handle = JobHandle::new(job_id.clone());
        let mut wait = self.settings.interval;

        for attempt in 1..=max_attempts {
            let snapshot = self.backend.poll(job_id).await.map_err(|err| {
                drafter_warn!("job {} status query {} failed: {}", job_id, attempt, err);
                err
            })?;
            drafter_debug!(
                "job {} attempt {}/{} -> {}",
                job_id,
                attempt,
                max_attempts,
                snapshot.status
            );
            if handle.apply_poll(snapshot) {
                on_status(handle.status());
            }

            match handle.status() {
                JobStatus::Done => {
                    drafter_info!("job {} done after {} polls", job_id, attempt);
                    return handle.into_result().ok_or_else(|| {
                        DraftError::remote(None, format!("job {job_id} finished without a result"))
                    });
                }
                JobStatus::Error => {
                    let message = handle
                        .error_message()
                        .filter(|message| !message.trim().is_empty())
                        .unwrap_or("job failed")
                        .to_string();
                    drafter_warn!("job {} failed: {}", job_id, message);
                    return Err(DraftError::JobFailed(message));
                }
                JobStatus::Queued | JobStatus::Running => {}
            }

            if attempt < max_attempts {
                tokio::time::sleep(wait).await;
                wait = self.settings.next_interval(wait);
            }
        }

        drafter_warn!(
            "job {} still {} after {} polls; giving up",
            job_id,
            handle.status(),
            max_attempts
        );
        Err(DraftError::Timeout {
            attempts: max_attempts,
        })
    }
}
