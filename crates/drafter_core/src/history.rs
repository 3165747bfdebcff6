use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ThreadId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftHistoryEntry {
    pub id: String,
    pub thread_id: ThreadId,
    pub thread_subject: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl DraftHistoryEntry {
    pub fn new(
        thread_id: impl Into<ThreadId>,
        thread_subject: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            thread_subject: thread_subject.into(),
            text: text.into(),
            created_at,
        }
    }
}

/// Session-scoped list of generated drafts, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftHistory {
    entries: VecDeque<DraftHistoryEntry>,
}

impl DraftHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: DraftHistoryEntry) {
        self.entries.push_front(entry);
    }

    pub fn list(&self) -> Vec<DraftHistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DraftHistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&DraftHistoryEntry> {
        self.entries.front()
    }

    pub fn get(&self, id: &str) -> Option<&DraftHistoryEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local-only dismissal for presentation; the engine never removes entries.
    pub fn remove(&mut self, id: &str) -> Option<DraftHistoryEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        self.entries.remove(index)
    }
}
