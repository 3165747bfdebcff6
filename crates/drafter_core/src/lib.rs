//! Drafter core: pure data model and state machines for draft generation.
//!
//! Nothing in this crate performs IO. The engine crate drives these types from
//! backend responses; presentation reads them back as snapshots.
mod batch;
mod edit;
mod error;
mod history;
mod job;
mod request;
mod runner;
mod thread;

pub use batch::{BatchRun, BatchSummary, MIN_BATCH_SIZE};
pub use edit::{
    update as update_edit, EditEffect, EditMsg, EditSession, EditView, PendingAction,
    CLEAR_PROMPT, REGENERATE_PROMPT,
};
pub use error::{DraftError, InvalidRequest, TransitionError};
pub use history::{DraftHistory, DraftHistoryEntry};
pub use job::{DraftResult, JobHandle, JobId, JobStatus, PollSnapshot, ThreadId};
pub use request::{
    DraftOptions, GenerationRequest, Tone, DEFAULT_LENGTH, MAX_LENGTH, MIN_LENGTH,
};
pub use runner::{ConversationMessage, RunnerState, RunnerStatus, Role};
pub use thread::{resolve_subject, ThreadSummary, UNKNOWN_SUBJECT};
