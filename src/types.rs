//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque job identifier returned by the backend on submission
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported media platforms
///
/// The serialized form (`"spotify"`, `"youtube-audio"`, ...) is the identifier
/// the backend expects in request bodies and artifact paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Spotify tracks, albums and playlists
    Spotify,
    /// YouTube, audio only
    YoutubeAudio,
    /// YouTube, full video
    YoutubeVideo,
    /// TikTok videos
    Tiktok,
    /// Twitter / X posts with media
    Twitter,
}

impl Platform {
    /// Every platform, in display order
    pub const ALL: [Platform; 5] = [
        Platform::Spotify,
        Platform::YoutubeAudio,
        Platform::YoutubeVideo,
        Platform::Tiktok,
        Platform::Twitter,
    ];

    /// Wire identifier
    pub fn id(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::YoutubeAudio => "youtube-audio",
            Platform::YoutubeVideo => "youtube-video",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::YoutubeAudio => "YouTube (audio)",
            Platform::YoutubeVideo => "YouTube (video)",
            Platform::Tiktok => "TikTok",
            Platform::Twitter => "Twitter / X",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| crate::error::ValidationError::UnknownPlatform(s.to_string()))
    }
}

/// A user submission: the URL to fetch and the platform it belongs to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Source media URL
    pub url: String,
    /// Selected platform
    pub platform: Platform,
}

impl DownloadRequest {
    /// Create a new request
    pub fn new(url: impl Into<String>, platform: Platform) -> Self {
        Self {
            url: url.into(),
            platform,
        }
    }
}

/// Result of a finished backend job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedJob {
    /// Media title reported by the backend
    pub title: String,
    /// Server-side output location
    pub output_path: Option<String>,
    /// Produced files, in backend order
    pub files: Vec<String>,
}

/// Job status as reported by the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Waiting for a backend worker
    Queued,
    /// Being processed, with an optional progress message
    Processing(Option<String>),
    /// Finished successfully
    Completed(CompletedJob),
    /// Finished with an error
    Failed {
        /// Backend error message
        message: String,
    },
}

/// Persisted summary of one completed download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Media title
    pub title: String,
    /// Platform the download came from
    pub platform: Platform,
    /// URL the user submitted
    pub source_url: String,
    /// Server-side output location
    #[serde(default)]
    pub output_path: Option<String>,
    /// Produced files, in backend order
    #[serde(default)]
    pub files: Vec<String>,
    /// When the job completed
    pub completed_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Build a record from the request that started a job and its completed result
    pub fn from_completed(
        request: &DownloadRequest,
        job: CompletedJob,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: job.title,
            platform: request.platform,
            source_url: request.url.clone(),
            output_path: job.output_path,
            files: job.files,
            completed_at,
        }
    }
}

/// Severity of a status event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress information
    Info,
    /// A download completed
    Success,
    /// Something went wrong
    Error,
}

/// Session-scoped log line describing orchestration progress
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Event severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
}

impl StatusEvent {
    /// Create an event stamped with the current time
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
        }
    }

    /// Informational event
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Success event
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    /// Error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// Orchestrator state for one download cycle
///
/// `Idle` is both the initial state and the only state a cycle ends in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Ready to accept a submission
    #[default]
    Idle,
    /// Checking the submitted URL
    Validating,
    /// Waiting for the backend to accept the job
    Submitting,
    /// Polling the backend for the job's status
    Polling {
        /// Job being polled
        job_id: JobId,
    },
}

impl OrchestratorState {
    /// Whether a new submission may be accepted
    pub fn is_idle(&self) -> bool {
        matches!(self, OrchestratorState::Idle)
    }
}

/// Event emitted to subscribers (presentation collaborators)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A status line was appended to the log
    Status(StatusEvent),

    /// Orchestrator moved to a new state
    StateChanged {
        /// The new state
        state: OrchestratorState,
    },

    /// A record was committed to history
    HistoryUpdated {
        /// The newly committed record (now at the head)
        record: HistoryRecord,
        /// History length after the commit
        len: usize,
    },

    /// The download succeeded and the URL input should be cleared
    ClearInput,

    /// Graceful shutdown initiated
    Shutdown,
}
