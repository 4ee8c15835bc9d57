//! Error types for media-dl
//!
//! This module provides the error hierarchy for the library:
//! - Domain-specific error types (validation, submission, status query, persistence)
//! - A top-level [`Error`] that wraps them together with I/O and network
//!   failures
//!
//! No error in this crate is fatal to the process. The orchestrator turns every
//! failure into a status event and returns to idle so the user can resubmit.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Platform;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "backend.base_url")
        key: Option<String>,
    },

    /// The request was rejected before any network call was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Job submission failed
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Status query failed while polling
    #[error(transparent)]
    Query(#[from] QueryError),

    /// History could not be read or written
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A download is already in progress - only one job may be polled at a time
    #[error("a download is already in progress")]
    Busy,

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// The backend reported the job as failed
    #[error("download failed: {0}")]
    JobFailed(String),

    /// Polling gave up after the configured maximum number of ticks
    #[error("gave up waiting for job {job_id} after {ticks} status checks")]
    TimedOut {
        /// Backend job identifier
        job_id: String,
        /// Number of status checks performed
        ticks: u32,
    },

    /// Polling was cancelled before the job reached a terminal state
    #[error("download of job {job_id} was cancelled")]
    Cancelled {
        /// Backend job identifier
        job_id: String,
    },

    /// Artifact not available on the backend
    #[error("file {filename} not found for platform {platform}")]
    FileNotFound {
        /// Platform the artifact belongs to
        platform: Platform,
        /// Requested filename
        filename: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Input validation errors (recovered locally, never reach the backend)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No URL was provided (empty or whitespace only)
    #[error("please enter a URL")]
    EmptyUrl,

    /// The URL does not match the selected platform's pattern
    #[error("invalid {platform} URL: {url}")]
    PlatformMismatch {
        /// Selected platform
        platform: Platform,
        /// The rejected URL
        url: String,
    },

    /// The platform identifier is not one of the known platforms
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

/// Job submission failure (non-success response or transport failure)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to start download: {reason}")]
pub struct SubmitError {
    /// Backend-provided error message, or a description of the transport failure
    pub reason: String,
}

impl SubmitError {
    /// Create a new submission error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Status query failure (transport failure or malformed response)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to check download status: {reason}")]
pub struct QueryError {
    /// Description of what went wrong
    pub reason: String,
}

impl QueryError {
    /// Create a new query error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// History persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// History file exists but could not be read
    #[error("failed to read history from {path}: {source}")]
    Read {
        /// History file location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// History file content could not be deserialized
    #[error("history at {path} is corrupt: {reason}")]
    Corrupt {
        /// History file location
        path: PathBuf,
        /// Deserialization failure description
        reason: String,
    },

    /// History could not be written
    #[error("failed to write history to {path}: {source}")]
    Write {
        /// History file location
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Short, user-facing reason for status events
    ///
    /// Submission and query errors carry the backend's own message, so the
    /// log shows what the server said rather than the wrapper text.
    pub fn reason(&self) -> String {
        match self {
            Error::Submit(e) => e.reason.clone(),
            Error::Query(e) => e.reason.clone(),
            Error::JobFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
