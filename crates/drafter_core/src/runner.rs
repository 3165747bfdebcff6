use serde_json::Value as JsonValue;

use crate::{DraftError, DraftResult, GenerationRequest, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunnerStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Prompt/response pair kept per runner, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub meta: JsonValue,
}

/// Observable state of one single-job runner.
///
/// Transitions: idle -> running -> (done | error), and from a terminal state
/// back to running on the next submission.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunnerState {
    status: RunnerStatus,
    job_id: Option<JobId>,
    result: Option<DraftResult>,
    error: Option<DraftError>,
    last_request: Option<GenerationRequest>,
    messages: Vec<ConversationMessage>,
}

impl RunnerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    pub fn result(&self) -> Option<&DraftResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&DraftError> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub fn last_request(&self) -> Option<&GenerationRequest> {
        self.last_request.as_ref()
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Enters `running`, clearing the previous outcome.
    pub fn begin(&mut self, request: GenerationRequest) -> Result<(), DraftError> {
        if self.status == RunnerStatus::Running {
            return Err(DraftError::Busy);
        }
        self.status = RunnerStatus::Running;
        self.job_id = None;
        self.result = None;
        self.error = None;
        self.last_request = Some(request);
        Ok(())
    }

    pub fn set_job_id(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
    }

    pub fn complete(&mut self, result: DraftResult) {
        if let Some(request) = &self.last_request {
            self.messages.push(ConversationMessage {
                role: Role::User,
                content: request.input().to_string(),
                meta: serde_json::json!({
                    "threadId": request.thread_id(),
                    "tone": request.tone().as_str(),
                    "length": request.length(),
                    "bullets": request.use_bullets(),
                }),
            });
        }
        self.messages.push(ConversationMessage {
            role: Role::Assistant,
            content: result.text.clone(),
            meta: result.meta.clone(),
        });
        self.status = RunnerStatus::Done;
        self.result = Some(result);
    }

    /// Drops back to idle when the caller stopped waiting mid-job. The remote
    /// job keeps running; only this runner forgets about it.
    pub fn abandon(&mut self) {
        if self.status == RunnerStatus::Running {
            self.status = RunnerStatus::Idle;
            self.job_id = None;
        }
    }

    /// Records a failure. Requests rejected before `begin` also land here so
    /// the error stays observable.
    pub fn fail(&mut self, error: DraftError) {
        self.status = RunnerStatus::Error;
        self.result = None;
        self.error = Some(error);
    }
}
