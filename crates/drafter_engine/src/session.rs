use std::sync::Arc;

use chrono::Utc;

use drafter_core::{
    resolve_subject, DraftError, DraftHistoryEntry, DraftResult, InvalidRequest, UNKNOWN_SUBJECT,
};
use drafter_logging::{drafter_info, drafter_warn};

use crate::backend::{
    ensure_authorized, AuthGate, GenerationBackend, MailSender, SendReceipt, ThreadDirectory,
};
use crate::{HistoryRecorder, HttpBackend, HttpSettings};

/// The collaborators and history shared by everything one user session runs.
///
/// Cheap to clone; runners and coordinators each hold their own copy.
#[derive(Clone)]
pub struct Session {
    backend: Arc<dyn GenerationBackend>,
    threads: Arc<dyn ThreadDirectory>,
    auth: Arc<dyn AuthGate>,
    mail: Arc<dyn MailSender>,
    history: HistoryRecorder,
}

impl Session {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        threads: Arc<dyn ThreadDirectory>,
        auth: Arc<dyn AuthGate>,
        mail: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            backend,
            threads,
            auth,
            mail,
            history: HistoryRecorder::new(),
        }
    }

    /// Every collaborator served by one HTTP API.
    pub fn over_http(settings: HttpSettings) -> Result<Self, DraftError> {
        let http = Arc::new(HttpBackend::new(settings)?);
        Ok(Self::new(http.clone(), http.clone(), http.clone(), http))
    }

    pub fn backend(&self) -> Arc<dyn GenerationBackend> {
        self.backend.clone()
    }

    pub fn threads(&self) -> &dyn ThreadDirectory {
        self.threads.as_ref()
    }

    pub fn auth(&self) -> &dyn AuthGate {
        self.auth.as_ref()
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub async fn ensure_authorized(&self) -> Result<(), DraftError> {
        ensure_authorized(self.auth.as_ref()).await
    }

    /// Subject for a history entry; listing failures degrade to "Unknown".
    pub async fn subject_for(&self, thread_id: &str) -> String {
        match self.threads.list_threads().await {
            Ok(threads) => resolve_subject(&threads, thread_id),
            Err(err) => {
                drafter_warn!("could not resolve subject for thread {}: {}", thread_id, err);
                UNKNOWN_SUBJECT.to_string()
            }
        }
    }

    pub(crate) async fn record_success(&self, thread_id: &str, result: &DraftResult) {
        let subject = self.subject_for(thread_id).await;
        self.history.record(DraftHistoryEntry::new(
            thread_id,
            subject,
            result.text.clone(),
            Utc::now(),
        ));
    }

    /// Delivers a final draft. A rejected authorization surfaces as
    /// `Unauthorized` so the caller can offer a reconnect.
    pub async fn send_draft(
        &self,
        thread_id: &str,
        draft_text: &str,
    ) -> Result<SendReceipt, DraftError> {
        if thread_id.trim().is_empty() {
            return Err(InvalidRequest::MissingThreadId.into());
        }
        if draft_text.trim().is_empty() {
            return Err(InvalidRequest::EmptyDraft.into());
        }
        self.ensure_authorized().await?;
        let receipt = self.mail.send(thread_id, draft_text).await?;
        drafter_info!("sent draft for thread {}", thread_id);
        Ok(receipt)
    }
}
