use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use drafter_core::{
    DraftError, DraftResult, GenerationRequest, JobId, JobStatus, PollSnapshot, ThreadSummary,
};
use drafter_logging::{drafter_debug, drafter_warn};

use crate::backend::{AuthGate, GenerationBackend, MailSender, SendReceipt, ThreadDirectory};
use crate::HttpSettings;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    project_id: &'a str,
    input: &'a str,
    meta: SubmitMeta<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitMeta<'a> {
    thread_id: &'a str,
    tone: &'static str,
    length: u32,
    bullets: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct PollResponse {
    status: JobStatus,
    #[serde(default)]
    result: Option<DraftResult>,
    #[serde(default)]
    error: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBody<'a> {
    project_id: &'a str,
    thread_id: &'a str,
    draft_text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    #[serde(default)]
    message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadsResponse {
    #[serde(default)]
    items: Vec<ThreadSummary>,
}

#[derive(Debug, Deserialize)]
struct AuthStatusResponse {
    #[serde(default)]
    connected: bool,
}

#[derive(Debug, Deserialize)]
struct AuthUrlResponse {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<JsonValue>,
}

/// All collaborator contracts over one HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    settings: HttpSettings,
    base: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(settings: HttpSettings) -> Result<Self, DraftError> {
        let base = Url::parse(&settings.base_url).map_err(|err| {
            DraftError::remote(None, format!("invalid base url {}: {err}", settings.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(DraftError::remote(
                None,
                format!("base url {} cannot carry paths", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| DraftError::remote(None, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        generic: &str,
    ) -> Result<T, DraftError> {
        drafter_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response, generic).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
        generic: &str,
    ) -> Result<T, DraftError> {
        drafter_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        decode(response, generic).await
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobId, DraftError> {
        let body = SubmitBody {
            project_id: &self.settings.project_id,
            input: request.input(),
            meta: SubmitMeta {
                thread_id: request.thread_id(),
                tone: request.tone().as_str(),
                length: request.length(),
                bullets: request.use_bullets(),
            },
        };
        let url = self.endpoint(&["agent", "run"], &[]);
        let response: SubmitResponse = self.post_json(url, &body, "Run failed").await?;
        Ok(JobId::new(response.job_id))
    }

    async fn poll(&self, job_id: &JobId) -> Result<PollSnapshot, DraftError> {
        let url = self.endpoint(&["jobs", job_id.as_str()], &[]);
        let response: PollResponse = self.get_json(url, "Job status check failed").await?;
        Ok(PollSnapshot {
            status: response.status,
            result: response.result,
            error: response.error.map(detail_text),
        })
    }
}

#[async_trait]
impl ThreadDirectory for HttpBackend {
    async fn list_threads(&self) -> Result<Vec<ThreadSummary>, DraftError> {
        let max = self.settings.max_threads.to_string();
        let url = self.endpoint(
            &["threads"],
            &[
                ("projectId", self.settings.project_id.as_str()),
                ("maxResults", max.as_str()),
            ],
        );
        let response: ThreadsResponse = self.get_json(url, "Failed to fetch threads").await?;
        Ok(response.items)
    }
}

#[async_trait]
impl AuthGate for HttpBackend {
    async fn is_connected(&self) -> Result<bool, DraftError> {
        let url = self.endpoint(
            &["auth", "status"],
            &[("project_id", self.settings.project_id.as_str())],
        );
        let response: AuthStatusResponse =
            self.get_json(url, "Auth status check failed").await?;
        Ok(response.connected)
    }

    async fn authorization_url(&self, redirect_to: Option<&str>) -> Result<String, DraftError> {
        let mut query = vec![("project_id", self.settings.project_id.as_str())];
        if let Some(redirect_to) = redirect_to {
            query.push(("redirect_to", redirect_to));
        }
        let url = self.endpoint(&["auth", "google"], &query);
        let response: AuthUrlResponse = self.get_json(url, "Failed to initiate OAuth").await?;
        Ok(response.authorization_url)
    }
}

#[async_trait]
impl MailSender for HttpBackend {
    async fn send(&self, thread_id: &str, draft_text: &str) -> Result<SendReceipt, DraftError> {
        let body = SendBody {
            project_id: &self.settings.project_id,
            thread_id,
            draft_text,
        };
        let url = self.endpoint(&["gmail", "send"], &[]);
        let response: SendResponse = match self.post_json(url, &body, "Send failed").await {
            Err(DraftError::Remote {
                status: Some(code), ..
            }) if is_auth_failure(code) => {
                drafter_warn!("send for thread {} rejected: reconnect required", thread_id);
                return Err(DraftError::Unauthorized);
            }
            other => other?,
        };
        Ok(SendReceipt {
            thread_id: thread_id.to_string(),
            message_id: response.message_id,
        })
    }
}

fn is_auth_failure(code: u16) -> bool {
    code == StatusCode::UNAUTHORIZED.as_u16() || code == StatusCode::FORBIDDEN.as_u16()
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    generic: &str,
) -> Result<T, DraftError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .map(detail_text)
            .filter(|text| !text.trim().is_empty());
        let message = detail.unwrap_or_else(|| generic.to_string());
        drafter_warn!("request failed with {}: {}", status, message);
        return Err(DraftError::remote(Some(status.as_u16()), message));
    }
    response.json::<T>().await.map_err(|err| {
        DraftError::remote(
            Some(status.as_u16()),
            format!("{generic}: unexpected response ({err})"),
        )
    })
}

/// Backend `detail`/`error` fields are usually strings but may be structured.
fn detail_text(value: JsonValue) -> String {
    match value {
        JsonValue::String(text) => text,
        other => other.to_string(),
    }
}

fn map_reqwest_error(err: reqwest::Error) -> DraftError {
    let status = err.status().map(|code| code.as_u16());
    if err.is_timeout() {
        return DraftError::remote(status, format!("request timed out: {err}"));
    }
    DraftError::remote(status, format!("network error: {err}"))
}
