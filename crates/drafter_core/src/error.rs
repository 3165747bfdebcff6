use thiserror::Error;

use crate::JobStatus;

/// Requests rejected locally; these never reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRequest {
    #[error("a thread id is required")]
    MissingThreadId,
    #[error("length {0} is outside the supported range {min}..={max}", min = crate::MIN_LENGTH, max = crate::MAX_LENGTH)]
    LengthOutOfRange(u32),
    #[error("a batch needs at least 2 distinct threads, got {0}")]
    InvalidBatchSize(usize),
    #[error("the draft is empty")]
    EmptyDraft,
    #[error("there is no previous request to regenerate")]
    NothingToRegenerate,
}

/// Every failure a draft request can end in.
///
/// Values are cloneable so observable state (runner snapshots, batch items)
/// can hold on to the error that ended a job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),
    #[error("not authorized; reconnect the mail account")]
    Unauthorized,
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },
    #[error("generation failed: {0}")]
    JobFailed(String),
    #[error("gave up waiting after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error("a draft is already being generated")]
    Busy,
}

impl DraftError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        DraftError::Remote {
            status,
            message: message.into(),
        }
    }

    /// True when presentation should offer a reconnect instead of a retry.
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, DraftError::Unauthorized)
    }

    /// Short machine-friendly label, used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            DraftError::InvalidRequest(_) => "invalid_request",
            DraftError::Unauthorized => "unauthorized",
            DraftError::Remote { .. } => "remote",
            DraftError::JobFailed(_) => "job_failed",
            DraftError::Timeout { .. } => "timeout",
            DraftError::Busy => "busy",
        }
    }
}

/// A status change that would break monotonic job progress.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move from {from} to {to}")]
    Backward { from: JobStatus, to: JobStatus },
    #[error("thread {0} is not part of this batch")]
    UnknownThread(String),
}
