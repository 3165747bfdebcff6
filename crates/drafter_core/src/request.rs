use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{InvalidRequest, ThreadId};

pub const MIN_LENGTH: u32 = 50;
pub const MAX_LENGTH: u32 = 500;
pub const DEFAULT_LENGTH: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Friendly,
    Formal,
    Brief,
}

impl Tone {
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Friendly => "friendly",
            Tone::Formal => "formal",
            Tone::Brief => "brief",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" => Ok(Tone::Friendly),
            "formal" => Ok(Tone::Formal),
            "brief" => Ok(Tone::Brief),
            other => Err(format!("unknown tone `{other}` (expected friendly, formal or brief)")),
        }
    }
}

/// Generation controls for a single draft or for every item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftOptions {
    pub tone: Tone,
    pub length: u32,
    pub use_bullets: bool,
    /// Optional free-text nudge passed to the model, e.g. "confirm Tuesday 3pm".
    #[serde(default)]
    pub input: String,
}

impl Default for DraftOptions {
    fn default() -> Self {
        Self {
            tone: Tone::default(),
            length: DEFAULT_LENGTH,
            use_bullets: false,
            input: String::new(),
        }
    }
}

impl DraftOptions {
    /// Checks the shared controls without needing a thread id.
    pub fn validate(&self) -> Result<(), InvalidRequest> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.length) {
            return Err(InvalidRequest::LengthOutOfRange(self.length));
        }
        Ok(())
    }

    pub fn request_for(&self, thread_id: &str) -> Result<GenerationRequest, InvalidRequest> {
        GenerationRequest::new(thread_id, self.tone, self.length, self.use_bullets)
            .map(|request| request.with_input(self.input.clone()))
    }
}

/// One validated draft request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    thread_id: ThreadId,
    tone: Tone,
    length: u32,
    use_bullets: bool,
    input: String,
}

impl GenerationRequest {
    pub fn new(
        thread_id: impl Into<ThreadId>,
        tone: Tone,
        length: u32,
        use_bullets: bool,
    ) -> Result<Self, InvalidRequest> {
        let thread_id = thread_id.into();
        if thread_id.trim().is_empty() {
            return Err(InvalidRequest::MissingThreadId);
        }
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(InvalidRequest::LengthOutOfRange(length));
        }
        Ok(Self {
            thread_id,
            tone,
            length,
            use_bullets,
            input: String::new(),
        })
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn use_bullets(&self) -> bool {
        self.use_bullets
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}
