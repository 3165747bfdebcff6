use serde::{Deserialize, Serialize};

/// Subject used when a thread cannot be found in the listing.
pub const UNKNOWN_SUBJECT: &str = "Unknown";

/// Thread metadata as reported by the thread-listing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub snippet: String,
}

/// Picks the subject for `thread_id` out of a listing.
pub fn resolve_subject(threads: &[ThreadSummary], thread_id: &str) -> String {
    threads
        .iter()
        .find(|thread| thread.id == thread_id)
        .map(|thread| thread.subject.trim())
        .filter(|subject| !subject.is_empty())
        .unwrap_or(UNKNOWN_SUBJECT)
        .to_string()
}
