use std::time::Duration;

/// Upper bound on in-flight jobs for one batch.
pub const MAX_BATCH_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub base_url: String,
    pub project_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// How many threads to ask the listing service for.
    pub max_threads: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            project_id: "default".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_threads: 20,
        }
    }
}

/// Bounds for waiting on one job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Growth factor for the wait between non-terminal polls. 1.0 keeps it fixed.
    pub backoff_factor: f64,
    pub max_interval: Duration,
}

impl PollSettings {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            backoff_factor: 1.0,
            max_interval: interval,
        }
    }

    /// Single drafts with a user watching.
    pub fn interactive() -> Self {
        Self::new(Duration::from_millis(800), 40)
    }

    /// Batch items, polled more gently.
    pub fn batch() -> Self {
        Self::new(Duration::from_millis(2000), 30)
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff_factor = if factor.is_finite() && factor >= 1.0 {
            factor
        } else {
            1.0
        };
        self.max_interval = max_interval.max(self.interval);
        self
    }

    /// Wait to use after `current`, honouring the backoff cap.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if self.backoff_factor <= 1.0 {
            return current;
        }
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::interactive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub interactive_poll: PollSettings,
    pub batch_poll: PollSettings,
    pub batch_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interactive_poll: PollSettings::interactive(),
            batch_poll: PollSettings::batch(),
            batch_concurrency: 1,
        }
    }
}
