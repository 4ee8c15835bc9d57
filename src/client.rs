//! Backend job client
//!
//! Thin request layer over the job-processing backend:
//!
//! | Operation    | Request                                      |
//! |--------------|----------------------------------------------|
//! | Submit job   | `POST /download` with `{url, platform}`      |
//! | Query status | `GET /status/{download_id}`                  |
//! | Fetch file   | `GET /download-file/{platform}/{filename}`   |
//!
//! Every call is a single request. Nothing here retries and nothing here
//! decides whether a status is terminal; that belongs to the poll loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use url::Url;

use crate::config::BackendConfig;
use crate::error::{Error, QueryError, Result, SubmitError};
use crate::types::{CompletedJob, DownloadRequest, JobId, JobStatus, Platform};

/// Title used when the backend completes a job without reporting one
pub const UNTITLED: &str = "Untitled";

/// Job submission and status queries
///
/// The orchestrator and poll loop only talk to the backend through this
/// trait, so tests and alternative transports can stand in for HTTP.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Submit a download job, returning the backend's job handle
    async fn submit(&self, request: &DownloadRequest) -> std::result::Result<JobId, SubmitError>;

    /// Fetch the current status of a job
    async fn fetch_status(&self, job_id: &JobId) -> std::result::Result<JobStatus, QueryError>;
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    url: &'a str,
    platform: Platform,
}

/// Backends disagree on whether ids are strings or integers
#[derive(Deserialize)]
#[serde(untagged)]
enum WireJobId {
    Text(String),
    Number(i64),
}

impl From<WireJobId> for JobId {
    fn from(id: WireJobId) -> Self {
        match id {
            WireJobId::Text(s) => JobId(s),
            WireJobId::Number(n) => JobId(n.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    download_id: Option<WireJobId>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    files: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TryFrom<StatusResponse> for JobStatus {
    type Error = QueryError;

    fn try_from(response: StatusResponse) -> std::result::Result<Self, QueryError> {
        match response.status.as_str() {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing(response.message)),
            "completed" => Ok(JobStatus::Completed(CompletedJob {
                title: response
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| UNTITLED.to_string()),
                output_path: response.output_path,
                files: response.files.unwrap_or_default(),
            })),
            "error" => Ok(JobStatus::Failed {
                message: response
                    .error
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            other => Err(QueryError::new(format!(
                "unexpected job status {:?}",
                other
            ))),
        }
    }
}

/// HTTP implementation of [`JobBackend`]
#[derive(Clone, Debug)]
pub struct HttpJobClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpJobClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is not an http(s) URL and
    /// [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.url()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// Backend base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        endpoint(&self.base_url, segments)
    }

    /// Link to a produced file on this backend
    pub fn resolve_file_link(&self, platform: Platform, filename: &str) -> String {
        resolve_file_link(&self.base_url, platform, filename)
    }

    /// Download a produced file into `dest_dir`
    ///
    /// Only the final path component of `filename` is used locally, so a
    /// backend-supplied name cannot write outside `dest_dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if the backend answers 404
    /// - [`Error::Network`] on transport failure or another non-success status
    /// - [`Error::Io`] if the file cannot be written
    pub async fn save_file(
        &self,
        platform: Platform,
        filename: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let local_name = Path::new(filename)
            .file_name()
            .ok_or_else(|| Error::FileNotFound {
                platform,
                filename: filename.to_string(),
            })?;

        let url = self.resolve_file_link(platform, filename);
        tracing::debug!(url = %url, "fetching artifact");

        let response = self.http.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::FileNotFound {
                platform,
                filename: filename.to_string(),
            });
        }
        let bytes = response.error_for_status()?.bytes().await?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(local_name);
        tokio::fs::write(&dest, &bytes).await?;

        tracing::info!(path = %dest.display(), size = bytes.len(), "artifact saved");
        Ok(dest)
    }
}

#[async_trait]
impl JobBackend for HttpJobClient {
    async fn submit(&self, request: &DownloadRequest) -> std::result::Result<JobId, SubmitError> {
        let url = self.endpoint(["download"]);
        tracing::debug!(url = %url, platform = %request.platform, "submitting job");

        let response = self
            .http
            .post(url)
            .json(&SubmitBody {
                url: &request.url,
                platform: request.platform,
            })
            .send()
            .await
            .map_err(|e| SubmitError::new(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("backend returned {}", status));
            return Err(SubmitError::new(reason));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SubmitError::new(format!("malformed response: {}", e)))?;

        match (body.download_id, body.error) {
            (Some(id), _) => Ok(id.into()),
            (None, Some(error)) => Err(SubmitError::new(error)),
            (None, None) => Err(SubmitError::new("malformed response: missing download_id")),
        }
    }

    async fn fetch_status(&self, job_id: &JobId) -> std::result::Result<JobStatus, QueryError> {
        if is_dot_segment(job_id.as_str()) {
            return Err(QueryError::new(format!("invalid job id {:?}", job_id.as_str())));
        }
        let url = self.endpoint(["status", job_id.as_str()]);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| QueryError::new(describe_transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("backend returned {}", status));
            return Err(QueryError::new(reason));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| QueryError::new(format!("malformed response: {}", e)))?;

        JobStatus::try_from(body)
    }
}

/// Append path segments to `base_url`, percent-encoding each one
///
/// `/`, `?`, `#` and `%` inside a segment are encoded, so caller-supplied
/// values cannot add path components or start a query. Segments that are
/// exactly `.` or `..` are dropped by the url crate, so callers must rule
/// those out first. A cannot-be-a-base URL is returned unchanged.
fn endpoint<'a>(base_url: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Link to a produced file: `{base}/download-file/{platform}/{filename}`
///
/// Pure formatting. The filename is not validated, only encoded. Returned as
/// text because a parsed [`Url`] collapses `%2E%2E` into a parent-directory
/// step, and a file named `..` must still get its own link.
pub fn resolve_file_link(base_url: &Url, platform: Platform, filename: &str) -> String {
    let mut prefix = endpoint(base_url, ["download-file", platform.id()]);
    prefix.set_query(None);
    prefix.set_fragment(None);
    format!(
        "{}/{}",
        prefix.as_str().trim_end_matches('/'),
        encode_segment(filename)
    )
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

/// Percent-encode one path segment, including the dots of `.` and `..`
fn encode_segment(segment: &str) -> Cow<'_, str> {
    match segment {
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        other => urlencoding::encode(other),
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("could not connect to backend: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}
