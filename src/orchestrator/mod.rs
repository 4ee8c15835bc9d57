//! Download orchestration split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by concern:
//! - [`submit`] - Validate, submit, poll and record one download
//! - [`lifecycle`] - Cancellation and shutdown coordination
//!
//! Each download cycle moves through
//! `Idle → Validating → Submitting → Polling → Idle`; any failure returns
//! straight to `Idle`. Only one cycle may be in flight at a time.

mod lifecycle;
mod submit;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{RwLock, broadcast, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::{HttpJobClient, JobBackend, resolve_file_link};
use crate::config::Config;
use crate::error::{PersistenceError, Result};
use crate::history::{HistoryLoad, HistoryStore};
use crate::platform::PlatformRegistry;
use crate::status_log::StatusLog;
use crate::types::{
    DownloadRequest, Event, HistoryRecord, OrchestratorState, Platform, StatusEvent,
};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Per-cycle state: the active flag, the request being handled and its
/// cancellation token
#[derive(Clone)]
pub(crate) struct CycleState {
    /// Set while a download cycle is in flight (single-flight guard)
    pub(crate) active: Arc<AtomicBool>,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Request currently being handled
    pub(crate) current_request: Arc<Mutex<Option<DownloadRequest>>>,
    /// Cancellation token of the in-flight cycle
    pub(crate) current_cancel: Arc<Mutex<Option<CancellationToken>>>,
    /// Parent of every per-cycle token; cancelled on shutdown
    pub(crate) shutdown_token: CancellationToken,
}

impl CycleState {
    fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            accepting_new: Arc::new(AtomicBool::new(true)),
            current_request: Arc::new(Mutex::new(None)),
            current_cancel: Arc::new(Mutex::new(None)),
            shutdown_token: CancellationToken::new(),
        }
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
///
/// Owns the orchestration state, the status log and the history. Presentation
/// layers hold a clone and observe it through [`subscribe`](Self::subscribe),
/// [`watch_state`](Self::watch_state) and the snapshot accessors.
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Platform URL rules and hints
    pub(crate) registry: Arc<PlatformRegistry>,
    /// Job submission and status backend
    pub(crate) backend: Arc<dyn JobBackend>,
    /// Backend base URL, for file links
    pub(crate) base_url: Url,
    /// Persisted download history
    pub(crate) history: Arc<RwLock<HistoryStore>>,
    /// Session status log
    pub(crate) status: StatusLog,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Current orchestrator state
    pub(crate) state_tx: Arc<watch::Sender<OrchestratorState>>,
    /// Single-flight and cancellation bookkeeping
    pub(crate) cycle: CycleState,
}

impl MediaDownloader {
    /// Create a downloader talking HTTP to the configured backend
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for invalid settings.
    /// An unreadable history file is not an error; it is logged and the
    /// history starts empty.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = HttpJobClient::new(&config.backend)?;
        Self::with_backend(config, Arc::new(client))
    }

    /// Create a downloader with a custom job backend
    pub fn with_backend(config: Config, backend: Arc<dyn JobBackend>) -> Result<Self> {
        config.validate()?;
        let base_url = config.backend.url()?;
        let registry = PlatformRegistry::builtin()?;

        let (history, outcome) = HistoryStore::open(&config.history.path, config.history.capacity);
        match outcome {
            HistoryLoad::Empty => {}
            HistoryLoad::Loaded { count } => {
                tracing::info!(count, "restored download history");
            }
            HistoryLoad::Recovered { error } => {
                tracing::warn!(error = %error, "stored history was unusable, starting with empty history");
            }
        }

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _state_rx) = watch::channel(OrchestratorState::Idle);

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            backend,
            base_url,
            history: Arc::new(RwLock::new(history)),
            status: StatusLog::new(event_tx.clone()),
            event_tx,
            state_tx: Arc::new(state_tx),
            cycle: CycleState::new(),
        })
    }

    /// Subscribe to status, state and history events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Follow the orchestrator state
    ///
    /// Presentation layers enable the submit control exactly when the
    /// received state is idle.
    pub fn watch_state(&self) -> watch::Receiver<OrchestratorState> {
        self.state_tx.subscribe()
    }

    /// Current orchestrator state
    pub fn state(&self) -> OrchestratorState {
        self.state_tx.borrow().clone()
    }

    /// Whether a new download may be submitted
    pub fn is_idle(&self) -> bool {
        !self.cycle.active.load(Ordering::SeqCst)
    }

    /// The request currently being handled, if any
    pub fn current_request(&self) -> Option<DownloadRequest> {
        lock(&self.cycle.current_request).clone()
    }

    /// Every status event of this session, oldest first
    pub fn status_log(&self) -> Vec<StatusEvent> {
        self.status.snapshot()
    }

    /// History snapshot, newest first
    pub async fn history(&self) -> Vec<HistoryRecord> {
        self.history.read().await.current().to_vec()
    }

    /// Remove every history record
    pub async fn clear_history(&self) -> std::result::Result<(), PersistenceError> {
        self.history.write().await.clear()
    }

    /// Platform rules and hints
    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    /// Input hint for a platform
    pub fn hint(&self, platform: Platform) -> &str {
        self.registry.hint(platform)
    }

    /// Link to one of a record's files on the backend
    pub fn file_link(&self, platform: Platform, filename: &str) -> String {
        resolve_file_link(&self.base_url, platform, filename)
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn set_state(&self, state: OrchestratorState) {
        tracing::debug!(?state, "orchestrator state");
        self.state_tx.send_replace(state.clone());
        self.event_tx.send(Event::StateChanged { state }).ok();
    }
}
