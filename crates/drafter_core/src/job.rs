use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use drafter_logging::drafter_warn;

use crate::TransitionError;

pub type ThreadId = String;

/// Opaque job identifier issued by the generation backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Done | JobStatus::Error => 2,
        }
    }

    /// Only strictly forward moves are allowed; terminal states are final.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn advance(self, next: JobStatus) -> Result<JobStatus, TransitionError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(TransitionError::Backward {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Text of a finished draft plus whatever metadata the backend attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftResult {
    pub text: String,
    #[serde(default)]
    pub meta: JsonValue,
}

impl DraftResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: JsonValue::Null,
        }
    }

    pub fn with_meta(mut self, meta: JsonValue) -> Self {
        self.meta = meta;
        self
    }
}

/// One decoded status response.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub status: JobStatus,
    pub result: Option<DraftResult>,
    pub error: Option<String>,
}

impl PollSnapshot {
    pub fn pending(status: JobStatus) -> Self {
        Self {
            status,
            result: None,
            error: None,
        }
    }

    pub fn done(result: DraftResult) -> Self {
        Self {
            status: JobStatus::Done,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            result: None,
            error: Some(message.into()),
        }
    }
}

/// Client-side view of one outstanding generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    job_id: JobId,
    status: JobStatus,
    result: Option<DraftResult>,
    error_message: Option<String>,
}

impl JobHandle {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            result: None,
            error_message: None,
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&DraftResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Folds a poll response into the handle.
    ///
    /// Repeating the current non-terminal status is fine. A response that would
    /// move the handle backwards, or touch it after a terminal state, is dropped.
    pub fn apply_poll(&mut self, snapshot: PollSnapshot) -> bool {
        if snapshot.status == self.status && !self.status.is_terminal() {
            return false;
        }
        if !self.status.can_advance_to(snapshot.status) {
            drafter_warn!(
                "job {} ignoring status {} after {}",
                self.job_id,
                snapshot.status,
                self.status
            );
            return false;
        }
        self.status = snapshot.status;
        match snapshot.status {
            JobStatus::Done => self.result = snapshot.result,
            JobStatus::Error => self.error_message = snapshot.error,
            JobStatus::Queued | JobStatus::Running => {}
        }
        true
    }

    /// Consumes the handle, yielding the result if the job finished successfully.
    pub fn into_result(self) -> Option<DraftResult> {
        self.result
    }
}
