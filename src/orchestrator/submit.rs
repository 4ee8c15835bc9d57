//! Download submission: one full `Validating → Submitting → Polling` cycle.

use chrono::Utc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::{MediaDownloader, lock};
use crate::error::{Error, Result, ValidationError};
use crate::poll::PollLoop;
use crate::types::{DownloadRequest, Event, HistoryRecord, OrchestratorState, Platform};

/// Holds the single-flight slot for one cycle and returns the orchestrator to
/// `Idle` when dropped, whichever way the cycle ends
struct ActiveCycle<'a> {
    downloader: &'a MediaDownloader,
}

impl<'a> ActiveCycle<'a> {
    fn begin(downloader: &'a MediaDownloader, cancel: CancellationToken) -> Self {
        *lock(&downloader.cycle.current_cancel) = Some(cancel);
        Self { downloader }
    }
}

impl Drop for ActiveCycle<'_> {
    fn drop(&mut self) {
        let cycle = &self.downloader.cycle;
        lock(&cycle.current_request).take();
        lock(&cycle.current_cancel).take();
        // The slot is free by the time `Idle` is published
        cycle.active.store(false, Ordering::SeqCst);
        self.downloader.set_state(OrchestratorState::Idle);
    }
}

impl MediaDownloader {
    /// Download `url` from `platform` and wait for the backend to finish
    ///
    /// Runs one orchestration cycle: validate the URL against the platform's
    /// pattern, submit the job, poll its status once per interval, and commit
    /// a history record on completion. Every outcome appends to the status
    /// log; failures also come back as the returned error.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    /// - [`Error::Busy`] while another download is in flight
    /// - [`Error::Validation`] for an empty or mismatched URL (no network call is made)
    /// - [`Error::Submit`] / [`Error::Query`] for backend or transport failures
    /// - [`Error::JobFailed`], [`Error::TimedOut`] or [`Error::Cancelled`] from polling
    /// - [`Error::Persistence`] if the completed record could not be stored
    pub async fn download(&self, url: &str, platform: Platform) -> Result<HistoryRecord> {
        if !self.cycle.accepting_new.load(Ordering::SeqCst) {
            return Err(self.reject(Error::ShuttingDown));
        }

        if self
            .cycle
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(url, "rejecting submission while a download is active");
            return Err(self.reject(Error::Busy));
        }

        // Shutdown may have started between the intake check and taking the slot
        if !self.cycle.accepting_new.load(Ordering::SeqCst)
            || self.cycle.shutdown_token.is_cancelled()
        {
            self.cycle.active.store(false, Ordering::SeqCst);
            return Err(self.reject(Error::ShuttingDown));
        }

        let cancel = self.cycle.shutdown_token.child_token();
        let _cycle = ActiveCycle::begin(self, cancel.clone());

        let result = self.run_cycle(url, platform, &cancel).await;
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    /// Like [`download`](Self::download), with the platform given by its identifier
    pub async fn download_by_id(&self, url: &str, platform_id: &str) -> Result<HistoryRecord> {
        let platform: Platform = match platform_id.parse() {
            Ok(platform) => platform,
            Err(e) => return Err(self.reject(Error::Validation(e))),
        };
        self.download(url, platform).await
    }

    async fn run_cycle(
        &self,
        url: &str,
        platform: Platform,
        cancel: &CancellationToken,
    ) -> Result<HistoryRecord> {
        self.set_state(OrchestratorState::Validating);
        let request = self.validate_request(url, platform)?;
        *lock(&self.cycle.current_request) = Some(request.clone());

        self.set_state(OrchestratorState::Submitting);
        if self.cycle.shutdown_token.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        let job_id = self.backend.submit(&request).await?;
        tracing::info!(job_id = %job_id, platform = %platform, url = %request.url, "download submitted");

        self.set_state(OrchestratorState::Polling {
            job_id: job_id.clone(),
        });
        let poll = PollLoop::new(
            self.backend.clone(),
            self.config.polling.clone(),
            self.status.clone(),
            cancel.clone(),
        );
        let job = poll.run(job_id).await?;

        let record = HistoryRecord::from_completed(&request, job, Utc::now());
        let len = {
            let mut history = self.history.write().await;
            history.commit(record.clone())?;
            history.len()
        };

        self.event_tx
            .send(Event::HistoryUpdated {
                record: record.clone(),
                len,
            })
            .ok();
        self.status
            .success(format!("Download complete: {}", record.title));
        self.event_tx.send(Event::ClearInput).ok();

        Ok(record)
    }

    fn validate_request(&self, url: &str, platform: Platform) -> Result<DownloadRequest> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl.into());
        }
        if !self.registry.validate(platform, url) {
            return Err(ValidationError::PlatformMismatch {
                platform,
                url: url.to_string(),
            }
            .into());
        }
        Ok(DownloadRequest::new(url, platform))
    }

    /// Log a refusal that happens outside any cycle and hand the error back
    fn reject(&self, error: Error) -> Error {
        self.report_failure(&error);
        error
    }

    fn report_failure(&self, error: &Error) {
        let message = match error {
            Error::Validation(ValidationError::EmptyUrl) => "Please enter a URL".to_string(),
            Error::Validation(ValidationError::PlatformMismatch { platform, .. }) => {
                format!(
                    "Invalid {} URL. {}",
                    platform.label(),
                    self.registry.hint(*platform)
                )
            }
            Error::Validation(ValidationError::UnknownPlatform(id)) => {
                format!("Unknown platform: {id}")
            }
            Error::Submit(e) => format!("Failed to start download: {}", e.reason),
            Error::Query(e) => format!("Failed to check download status: {}", e.reason),
            Error::JobFailed(message) => format!("Download failed: {message}"),
            Error::TimedOut { ticks, .. } => {
                format!("Download timed out after {ticks} status checks")
            }
            Error::Cancelled { .. } => "Download cancelled".to_string(),
            Error::Busy => "A download is already in progress".to_string(),
            Error::ShuttingDown => "Shutting down, not accepting new downloads".to_string(),
            Error::Persistence(e) => format!("Failed to save download history: {e}"),
            other => format!("Download failed: {}", other.reason()),
        };
        self.status.error(message);
    }
}
