//! Shared test helpers for creating MediaDownloader instances in tests.

use crate::client::JobBackend;
use crate::config::Config;
use crate::error::{QueryError, SubmitError};
use crate::orchestrator::MediaDownloader;
use crate::types::{CompletedJob, DownloadRequest, JobId, JobStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

/// In-memory backend replaying a fixed script of responses
pub(crate) struct ScriptedBackend {
    submit_result: Mutex<Result<JobId, SubmitError>>,
    statuses: Mutex<VecDeque<Result<JobStatus, QueryError>>>,
    repeat: Option<JobStatus>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
    submitted: Mutex<Vec<DownloadRequest>>,
}

impl ScriptedBackend {
    fn build(
        statuses: Vec<Result<JobStatus, QueryError>>,
        repeat: Option<JobStatus>,
    ) -> Self {
        Self {
            submit_result: Mutex::new(Ok(JobId::new("1"))),
            statuses: Mutex::new(statuses.into()),
            repeat,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Answer status checks with `statuses` in order, then fail every check
    pub(crate) fn with_statuses(statuses: Vec<Result<JobStatus, QueryError>>) -> Self {
        Self::build(statuses, None)
    }

    /// Answer every status check with `status`
    pub(crate) fn repeating(status: JobStatus) -> Self {
        Self::build(Vec::new(), Some(status))
    }

    /// Reject every submission with `reason`
    pub(crate) fn rejecting(reason: &str) -> Self {
        let backend = Self::build(Vec::new(), None);
        *backend.submit_result.lock().unwrap() = Err(SubmitError::new(reason));
        backend
    }

    /// Job id handed out by a successful submission
    pub(crate) fn with_job_id(self, id: &str) -> Self {
        *self.submit_result.lock().unwrap() = Ok(JobId::new(id));
        self
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn submitted(&self) -> Vec<DownloadRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit(&self, request: &DownloadRequest) -> Result<JobId, SubmitError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());
        self.submit_result.lock().unwrap().clone()
    }

    async fn fetch_status(&self, _job_id: &JobId) -> Result<JobStatus, QueryError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(status) => Ok(status.clone()),
            None => Err(QueryError::new("no scripted status left")),
        }
    }
}

/// A completed job with one file named after the title
pub(crate) fn completed(title: &str) -> JobStatus {
    JobStatus::Completed(CompletedJob {
        title: title.to_string(),
        output_path: Some(format!("/downloads/{title}")),
        files: vec![format!("{}.mp3", title.to_lowercase())],
    })
}

/// Config with a fast poll interval and history inside `dir`
pub(crate) fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.history.path = dir.join("history.json");
    config.polling.interval = Duration::from_millis(5);
    config
}

/// Helper to create a test MediaDownloader backed by `backend`.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn create_test_downloader(
    backend: Arc<ScriptedBackend>,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = MediaDownloader::with_backend(config, backend).unwrap();
    (downloader, temp_dir)
}
