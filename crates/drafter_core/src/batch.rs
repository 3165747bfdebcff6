use std::collections::HashMap;

use crate::{DraftResult, InvalidRequest, JobStatus, ThreadId, TransitionError};

pub const MIN_BATCH_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn pending(&self) -> usize {
        self.total - self.completed - self.failed
    }
}

/// Per-thread bookkeeping for one multi-thread run.
///
/// Every item has exactly one status from construction on, and statuses only
/// ever move forward. Counts are derived from the status map on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRun {
    items: Vec<ThreadId>,
    status_by_thread: HashMap<ThreadId, JobStatus>,
    result_by_thread: HashMap<ThreadId, DraftResult>,
    error_by_thread: HashMap<ThreadId, String>,
}

impl BatchRun {
    /// Builds a run over `thread_ids` in input order, dropping blanks and
    /// repeated ids (the first occurrence keeps its place).
    pub fn new<I, S>(thread_ids: I) -> Result<Self, InvalidRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<ThreadId>,
    {
        let mut items: Vec<ThreadId> = Vec::new();
        let mut status_by_thread = HashMap::new();
        for thread_id in thread_ids {
            let thread_id: ThreadId = thread_id.into();
            let thread_id = thread_id.trim().to_string();
            if thread_id.is_empty() || status_by_thread.contains_key(&thread_id) {
                continue;
            }
            status_by_thread.insert(thread_id.clone(), JobStatus::Queued);
            items.push(thread_id);
        }
        if items.len() < MIN_BATCH_SIZE {
            return Err(InvalidRequest::InvalidBatchSize(items.len()));
        }
        Ok(Self {
            items,
            status_by_thread,
            result_by_thread: HashMap::new(),
            error_by_thread: HashMap::new(),
        })
    }

    pub fn items(&self) -> &[ThreadId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn status(&self, thread_id: &str) -> Option<JobStatus> {
        self.status_by_thread.get(thread_id).copied()
    }

    pub fn result(&self, thread_id: &str) -> Option<&DraftResult> {
        self.result_by_thread.get(thread_id)
    }

    pub fn error(&self, thread_id: &str) -> Option<&str> {
        self.error_by_thread.get(thread_id).map(String::as_str)
    }

    /// Items with their statuses, in input order.
    pub fn statuses(&self) -> Vec<(ThreadId, JobStatus)> {
        self.items
            .iter()
            .map(|id| (id.clone(), self.status_by_thread[id]))
            .collect()
    }

    pub fn mark_running(&mut self, thread_id: &str) -> Result<(), TransitionError> {
        self.advance(thread_id, JobStatus::Running)
    }

    pub fn mark_done(&mut self, thread_id: &str, result: DraftResult) -> Result<(), TransitionError> {
        self.advance(thread_id, JobStatus::Done)?;
        self.result_by_thread.insert(thread_id.to_string(), result);
        Ok(())
    }

    pub fn mark_failed(
        &mut self,
        thread_id: &str,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.advance(thread_id, JobStatus::Error)?;
        self.error_by_thread
            .insert(thread_id.to_string(), message.into());
        Ok(())
    }

    fn advance(&mut self, thread_id: &str, next: JobStatus) -> Result<(), TransitionError> {
        let current = self
            .status_by_thread
            .get_mut(thread_id)
            .ok_or_else(|| TransitionError::UnknownThread(thread_id.to_string()))?;
        *current = current.advance(next)?;
        Ok(())
    }

    pub fn completed(&self) -> usize {
        self.count(JobStatus::Done)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Error)
    }

    pub fn is_terminal(&self) -> bool {
        self.status_by_thread.values().all(|s| s.is_terminal())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.items.len(),
            completed: self.completed(),
            failed: self.failed(),
        }
    }

    fn count(&self, status: JobStatus) -> usize {
        self.status_by_thread
            .values()
            .filter(|s| **s == status)
            .count()
    }
}
