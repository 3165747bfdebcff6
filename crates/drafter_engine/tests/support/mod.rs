#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use drafter_core::{
    DraftError, DraftResult, GenerationRequest, JobId, JobStatus, PollSnapshot, ThreadSummary,
};
use drafter_engine::{
    AuthGate, BatchEvent, BatchSink, GenerationBackend, MailSender, SendReceipt, Session,
    ThreadDirectory,
};

pub fn init_logging() {
    drafter_logging::initialize_for_tests();
}

pub fn running() -> Result<PollSnapshot, DraftError> {
    Ok(PollSnapshot::pending(JobStatus::Running))
}

pub fn done(text: &str) -> Result<PollSnapshot, DraftError> {
    Ok(PollSnapshot::done(DraftResult::new(text)))
}

pub fn failed(message: &str) -> Result<PollSnapshot, DraftError> {
    Ok(PollSnapshot::failed(message))
}

type PollHook = Box<dyn Fn(&JobId) + Send + Sync>;

/// Backend whose poll answers are scripted per thread id.
///
/// When a script runs down to its last answer, that answer repeats forever.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Result<PollSnapshot, DraftError>>>>,
    submit_errors: Mutex<HashMap<String, DraftError>>,
    jobs: Mutex<HashMap<JobId, String>>,
    submitted: Mutex<Vec<GenerationRequest>>,
    active_polls: Mutex<HashSet<JobId>>,
    overlapping_poll: AtomicBool,
    next_id: AtomicUsize,
    polls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    on_poll: Mutex<Option<PollHook>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(
        &self,
        thread_id: &str,
        answers: impl IntoIterator<Item = Result<PollSnapshot, DraftError>>,
    ) {
        self.scripts
            .lock()
            .unwrap()
            .insert(thread_id.to_string(), answers.into_iter().collect());
    }

    pub fn fail_submit(&self, thread_id: &str, err: DraftError) {
        self.submit_errors
            .lock()
            .unwrap()
            .insert(thread_id.to_string(), err);
    }

    pub fn on_poll(&self, hook: impl Fn(&JobId) + Send + Sync + 'static) {
        *self.on_poll.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn submitted(&self) -> Vec<GenerationRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_threads(&self) -> Vec<String> {
        self.submitted()
            .iter()
            .map(|r| r.thread_id().to_string())
            .collect()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn saw_overlapping_polls(&self) -> bool {
        self.overlapping_poll.load(Ordering::SeqCst)
    }

    fn next_answer(&self, thread_id: &str) -> Result<PollSnapshot, DraftError> {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(queue) = scripts.get_mut(thread_id) else {
            return Err(DraftError::remote(Some(404), "Job not found"));
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, DraftError> {
        self.submitted.lock().unwrap().push(request.clone());
        if let Some(err) = self.submit_errors.lock().unwrap().get(request.thread_id()) {
            return Err(err.clone());
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let job_id = JobId::new(format!("j{n}"));
        self.jobs
            .lock()
            .unwrap()
            .insert(job_id.clone(), request.thread_id().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(job_id)
    }

    async fn poll(&self, job_id: &JobId) -> Result<PollSnapshot, DraftError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.active_polls.lock().unwrap().insert(job_id.clone()) {
            self.overlapping_poll.store(true, Ordering::SeqCst);
        }
        tokio::task::yield_now().await;
        self.active_polls.lock().unwrap().remove(job_id);

        if let Some(hook) = self.on_poll.lock().unwrap().as_ref() {
            hook(job_id);
        }
        let thread_id = self.jobs.lock().unwrap().get(job_id).cloned();
        let answer = match thread_id {
            Some(thread_id) => self.next_answer(&thread_id),
            None => Err(DraftError::remote(Some(404), "Job not found")),
        };
        let finished = match &answer {
            Ok(snapshot) => snapshot.status.is_terminal(),
            Err(_) => true,
        };
        if finished {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        answer
    }
}

pub struct FakeDirectory {
    threads: Vec<ThreadSummary>,
    fail: bool,
}

impl FakeDirectory {
    pub fn with(threads: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            threads: threads
                .iter()
                .map(|(id, subject)| ThreadSummary {
                    id: id.to_string(),
                    subject: subject.to_string(),
                    from: "sam@example.com".to_string(),
                    date: "2024-05-01".to_string(),
                    snippet: String::new(),
                })
                .collect(),
            fail: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            threads: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl ThreadDirectory for FakeDirectory {
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, DraftError> {
        if self.fail {
            Err(DraftError::remote(Some(500), "Failed to fetch threads"))
        } else {
            Ok(self.threads.clone())
        }
    }
}

pub struct FakeAuth {
    connected: AtomicBool,
}

impl FakeAuth {
    pub fn connected(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
        })
    }
}

#[async_trait]
impl AuthGate for FakeAuth {
    async fn is_connected(&self) -> Result<bool, DraftError> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn authorization_url(&self, _redirect_to: Option<&str>) -> Result<String, DraftError> {
        Ok("https://auth.example.com/connect".to_string())
    }
}

#[derive(Default)]
pub struct FakeMail {
    sent: Mutex<Vec<(String, String)>>,
    error: Mutex<Option<DraftError>>,
}

impl FakeMail {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, err: DraftError) {
        *self.error.lock().unwrap() = Some(err);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for FakeMail {
    async fn send(&self, thread_id: &str, draft_text: &str) -> Result<SendReceipt, DraftError> {
        if let Some(err) = self.error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent
            .lock()
            .unwrap()
            .push((thread_id.to_string(), draft_text.to_string()));
        Ok(SendReceipt {
            thread_id: thread_id.to_string(),
            message_id: Some("m1".to_string()),
        })
    }
}

pub struct Fixture {
    pub backend: Arc<ScriptedBackend>,
    pub mail: Arc<FakeMail>,
    pub session: Session,
}

pub fn fixture(connected: bool) -> Fixture {
    let backend = ScriptedBackend::new();
    let mail = FakeMail::new();
    let session = Session::new(
        backend.clone(),
        FakeDirectory::with(&[("t1", "Q3 Planning"), ("t2", "Invoice #3421"), ("t3", "Offsite")]),
        FakeAuth::connected(connected),
        mail.clone(),
    );
    Fixture {
        backend,
        mail,
        session,
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BatchEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<BatchEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl BatchSink for RecordingSink {
    fn emit(&self, event: BatchEvent) {
        self.events.lock().unwrap().push(event);
    }
}
