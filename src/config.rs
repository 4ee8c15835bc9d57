//! Configuration types for media-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};
use url::Url;

/// Job-processing backend connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend base URL (default: "http://localhost:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout applied to every backend request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl BackendConfig {
    /// Parsed base URL
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless the base URL parses as an http(s) URL
    /// that can carry a path.
    pub fn url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("invalid backend URL {:?}: {}", self.base_url, e),
            key: Some("backend.base_url".to_string()),
        })?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("backend URL must be http(s): {}", self.base_url),
                key: Some("backend.base_url".to_string()),
            });
        }

        Ok(url)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Status polling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between status checks, in milliseconds on the wire (default: 1 second)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub interval: Duration,

    /// Maximum number of status checks before giving up (None = poll until terminal)
    ///
    /// Exceeding the limit ends the job with [`Error::TimedOut`].
    #[serde(default)]
    pub max_ticks: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_ticks: None,
        }
    }
}

/// Download history persistence settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History file; this is the fixed key the record sequence is stored under
    /// (default: "./media-dl-history.json")
    #[serde(default = "default_history_path")]
    pub path: PathBuf,

    /// Maximum number of records kept, newest first (default: 10)
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            capacity: default_history_capacity(),
        }
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`backend`](BackendConfig) - where jobs are submitted and polled
/// - [`polling`](PollConfig) - tick interval and optional tick limit
/// - [`history`](HistoryConfig) - persisted history location and capacity
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Status polling settings
    #[serde(default)]
    pub polling: PollConfig,

    /// History persistence settings
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields take their defaults. The result is validated before it
    /// is returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise fail later at runtime
    pub fn validate(&self) -> Result<()> {
        self.backend.url()?;

        if self.polling.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("polling.interval".to_string()),
            });
        }

        if self.polling.max_ticks == Some(0) {
            return Err(Error::Config {
                message: "max_ticks must be at least 1 when set".to_string(),
                key: Some("polling.max_ticks".to_string()),
            });
        }

        if self.history.capacity == 0 {
            return Err(Error::Config {
                message: "history capacity must be at least 1".to_string(),
                key: Some("history.capacity".to_string()),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./media-dl-history.json")
}

fn default_history_capacity() -> usize {
    10
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (sub-second poll intervals)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
