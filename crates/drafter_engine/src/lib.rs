//! Drafter engine: collaborator IO, job polling and batch execution.
mod backend;
mod batch;
mod engine;
mod history;
mod http;
mod poll;
mod runner;
mod session;
mod settings;

pub use backend::{AuthGate, GenerationBackend, MailSender, SendReceipt, ThreadDirectory};
pub use batch::{BatchCoordinator, BatchEvent, BatchProgress, BatchSink, NullBatchSink};
pub use engine::{AuthState, EngineEvent, EngineHandle};
pub use history::HistoryRecorder;
pub use http::HttpBackend;
pub use poll::PollingScheduler;
pub use runner::{JobRunner, RunnerObserver};
pub use session::Session;
pub use settings::{EngineConfig, HttpSettings, PollSettings, MAX_BATCH_CONCURRENCY};
