//! `drafter.ron` loading.
//!
//! Every field is optional in the file; anything left out keeps its default.
//! `DRAFTER_BASE_URL` and `DRAFTER_PROJECT_ID` override the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use drafter_engine::{EngineConfig, HttpSettings, PollSettings};
use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const DEFAULT_CONFIG_FILE: &str = "drafter.ron";
pub const BASE_URL_ENV: &str = "DRAFTER_BASE_URL";
pub const PROJECT_ID_ENV: &str = "DRAFTER_PROJECT_ID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("config field `{field}` must not be empty")]
    Empty { field: &'static str },
}

/// Poll overrides. Fields left out fall back to the defaults of whichever
/// poll profile (interactive or batch) the section configures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_factor: Option<f64>,
    pub max_interval_ms: Option<u64>,
}

impl PollConfig {
    pub fn resolve(self, base: PollSettings) -> PollSettings {
        let interval = self.interval_ms.map_or(base.interval, Duration::from_millis);
        let max_interval = self
            .max_interval_ms
            .map_or(base.max_interval, Duration::from_millis);
        PollSettings::new(interval, self.max_attempts.unwrap_or(base.max_attempts)).with_backoff(
            self.backoff_factor.unwrap_or(base.backoff_factor),
            max_interval,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrafterConfig {
    pub base_url: String,
    pub project_id: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub max_threads: u32,
    pub interactive_poll: PollConfig,
    pub batch_poll: PollConfig,
    pub batch_concurrency: usize,
    pub log_destination: LogDestination,
    /// File the values came from; `None` when running on defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for DrafterConfig {
    fn default() -> Self {
        let http = HttpSettings::default();
        let engine = EngineConfig::default();
        Self {
            base_url: http.base_url,
            project_id: http.project_id,
            connect_timeout_ms: millis(http.connect_timeout),
            request_timeout_ms: millis(http.request_timeout),
            max_threads: http.max_threads,
            interactive_poll: PollConfig::default(),
            batch_poll: PollConfig::default(),
            batch_concurrency: engine.batch_concurrency,
            log_destination: LogDestination::default(),
            source: None,
        }
    }
}

impl DrafterConfig {
    /// Loads `explicit` if given (it must exist), otherwise `./drafter.ron`
    /// when present, otherwise defaults. Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_ron(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Optional fields take bare values (`max_attempts: 10`), not `Some(10)`.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::Options::default()
            .with_default_extension(Extensions::IMPLICIT_SOME)
            .from_str(text)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(project) = lookup(PROJECT_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.project_id = project;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Empty { field: "base_url" });
        }
        if self.project_id.trim().is_empty() {
            return Err(ConfigError::Empty { field: "project_id" });
        }
        Ok(())
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.base_url.clone(),
            project_id: self.project_id.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            max_threads: self.max_threads,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            interactive_poll: self.interactive_poll.resolve(PollSettings::interactive()),
            batch_poll: self.batch_poll.resolve(PollSettings::batch()),
            batch_concurrency: self.batch_concurrency,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
