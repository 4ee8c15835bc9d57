//! Status polling for one in-flight job
//!
//! A [`PollLoop`] checks a job's status once per tick until the backend
//! reports a terminal status:
//!
//! - `completed` → `Ok(CompletedJob)`
//! - `error` → [`Error::JobFailed`]
//! - `queued` / `processing` → info status event, sleep one interval, tick again
//!
//! A failed status request ends the loop immediately with [`Error::Query`];
//! there is no retry. The cancellation token is checked before every tick
//! and raced against every request and sleep. With `max_ticks` set, a job
//! still running after that many checks ends with [`Error::TimedOut`].

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::client::JobBackend;
use crate::config::PollConfig;
use crate::error::{Error, Result};
use crate::status_log::StatusLog;
use crate::types::{CompletedJob, JobId, JobStatus};

/// Drives status checks for a single job
pub struct PollLoop {
    backend: Arc<dyn JobBackend>,
    config: PollConfig,
    status: StatusLog,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Create a poll loop
    pub fn new(
        backend: Arc<dyn JobBackend>,
        config: PollConfig,
        status: StatusLog,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            config,
            status,
            cancel,
        }
    }

    /// Poll `job_id` until it reaches a terminal outcome
    ///
    /// # Errors
    ///
    /// - [`Error::Query`] if a status request fails
    /// - [`Error::JobFailed`] if the backend reports the job as failed
    /// - [`Error::TimedOut`] if `max_ticks` checks pass without a terminal status
    /// - [`Error::Cancelled`] if the token is cancelled
    pub async fn run(self, job_id: JobId) -> Result<CompletedJob> {
        let mut ticks: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(&job_id));
            }

            ticks += 1;
            tracing::debug!(job_id = %job_id, tick = ticks, "checking job status");

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(&job_id)),
                result = self.backend.fetch_status(&job_id) => result,
            };

            match fetched {
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "status check failed");
                    return Err(e.into());
                }
                Ok(JobStatus::Completed(job)) => {
                    tracing::info!(job_id = %job_id, title = %job.title, ticks, "job completed");
                    return Ok(job);
                }
                Ok(JobStatus::Failed { message }) => {
                    tracing::warn!(job_id = %job_id, error = %message, "job failed");
                    return Err(Error::JobFailed(message));
                }
                Ok(JobStatus::Queued) => {
                    self.status.info("Waiting in queue...");
                }
                Ok(JobStatus::Processing(message)) => {
                    self.status
                        .info(message.unwrap_or_else(|| "Processing download...".to_string()));
                }
            }

            if let Some(max_ticks) = self.config.max_ticks
                && ticks >= max_ticks
            {
                tracing::warn!(job_id = %job_id, ticks, "giving up on job");
                return Err(Error::TimedOut {
                    job_id: job_id.to_string(),
                    ticks,
                });
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(self.cancelled(&job_id)),
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    fn cancelled(&self, job_id: &JobId) -> Error {
        tracing::info!(job_id = %job_id, "polling cancelled");
        Error::Cancelled {
            job_id: job_id.to_string(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use crate::orchestrator::test_helpers::ScriptedBackend;
    use crate::types::Severity;
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn fast_config(max_ticks: Option<u32>) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_ticks,
        }
    }

    fn status_log() -> StatusLog {
        let (tx, _rx) = broadcast::channel(64);
        StatusLog::new(tx)
    }

    fn completed(title: &str) -> JobStatus {
        JobStatus::Completed(CompletedJob {
            title: title.to_string(),
            output_path: None,
            files: vec![format!("{title}.mp3")],
        })
    }

    #[tokio::test]
    async fn polls_until_completed_emitting_info_per_tick() {
        let backend = Arc::new(ScriptedBackend::with_statuses(vec![
            Ok(JobStatus::Queued),
            Ok(JobStatus::Processing(Some("Converting to mp3".into()))),
            Ok(completed("Song")),
        ]));
        let log = status_log();
        let poll = PollLoop::new(
            backend.clone(),
            fast_config(None),
            log.clone(),
            CancellationToken::new(),
        );

        let job = poll.run(JobId::new("1")).await.unwrap();
        assert_eq!(job.title, "Song");
        assert_eq!(backend.status_calls(), 3);

        let events = log.snapshot();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.severity == Severity::Info));
        assert_eq!(events[1].message, "Converting to mp3");
    }

    #[tokio::test]
    async fn query_error_ends_polling_without_retry() {
        let backend = Arc::new(ScriptedBackend::with_statuses(vec![
            Ok(JobStatus::Processing(None)),
            Err(QueryError::new("connection reset")),
            Ok(completed("never reached")),
        ]));
        let poll = PollLoop::new(
            backend.clone(),
            fast_config(None),
            status_log(),
            CancellationToken::new(),
        );

        let err = poll.run(JobId::new("1")).await.unwrap_err();
        assert!(matches!(err, Error::Query(ref q) if q.reason == "connection reset"));
        assert_eq!(backend.status_calls(), 2);
    }

    #[tokio::test]
    async fn backend_failure_is_job_failed() {
        let backend = Arc::new(ScriptedBackend::with_statuses(vec![Ok(JobStatus::Failed {
            message: "Video unavailable".into(),
        })]));
        let poll = PollLoop::new(
            backend,
            fast_config(None),
            status_log(),
            CancellationToken::new(),
        );

        match poll.run(JobId::new("9")).await.unwrap_err() {
            Error::JobFailed(message) => assert_eq!(message, "Video unavailable"),
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn max_ticks_yields_timed_out() {
        let backend = Arc::new(ScriptedBackend::repeating(JobStatus::Processing(None)));
        let poll = PollLoop::new(
            backend.clone(),
            fast_config(Some(3)),
            status_log(),
            CancellationToken::new(),
        );

        match poll.run(JobId::new("slow")).await.unwrap_err() {
            Error::TimedOut { job_id, ticks } => {
                assert_eq!(job_id, "slow");
                assert_eq!(ticks, 3);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(backend.status_calls(), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_tick() {
        let backend = Arc::new(ScriptedBackend::repeating(JobStatus::Queued));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let poll = PollLoop::new(backend.clone(), fast_config(None), status_log(), cancel);
        let err = poll.run(JobId::new("1")).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }));
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        let backend = Arc::new(ScriptedBackend::repeating(JobStatus::Queued));
        let cancel = CancellationToken::new();
        let config = PollConfig {
            interval: Duration::from_secs(3600),
            max_ticks: None,
        };

        let poll = PollLoop::new(backend.clone(), config, status_log(), cancel.clone());
        let handle = tokio::spawn(poll.run(JobId::new("1")));

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("poll loop did not observe cancellation")
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled { .. })));
        assert_eq!(backend.status_calls(), 1);
    }
}
