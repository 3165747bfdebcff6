use async_trait::async_trait;

use drafter_core::{DraftError, GenerationRequest, JobId, PollSnapshot, ThreadSummary};

/// Accepts draft requests and reports on them by job id.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, DraftError>;

    async fn poll(&self, job_id: &JobId) -> Result<PollSnapshot, DraftError>;
}

/// Lists the mailbox threads a draft can be written for.
#[async_trait]
pub trait ThreadDirectory: Send + Sync {
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, DraftError>;
}

/// Mail account connection state.
#[async_trait]
pub trait AuthGate: Send + Sync {
    async fn is_connected(&self) -> Result<bool, DraftError>;

    /// URL the user should visit to (re)connect the account.
    async fn authorization_url(&self, redirect_to: Option<&str>) -> Result<String, DraftError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendReceipt {
    pub thread_id: String,
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, thread_id: &str, draft_text: &str) -> Result<SendReceipt, DraftError>;
}

/// Fails fast with `Unauthorized` unless the account is connected.
pub(crate) async fn ensure_authorized(auth: &dyn AuthGate) -> Result<(), DraftError> {
    if auth.is_connected().await? {
        Ok(())
    } else {
        Err(DraftError::Unauthorized)
    }
}
