//! # media-dl
//!
//! Orchestration engine for a media download backend: validates user URLs
//! per platform, submits download jobs, polls them to completion and keeps a
//! short persisted history of finished downloads.
//!
//! ## Design Philosophy
//!
//! - **Single flight** - one download cycle at a time, enforced inside the
//!   orchestrator rather than by whoever renders the submit button
//! - **No hidden retries** - a failed submission or status check ends the
//!   cycle and is reported; the user decides whether to resubmit
//! - **Event-driven** - presentation layers subscribe to events and follow
//!   the orchestrator state instead of reading shared globals
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaDownloader, Platform};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let record = downloader
//!         .download("https://open.spotify.com/track/abc", Platform::Spotify)
//!         .await?;
//!     for file in &record.files {
//!         println!("{}", downloader.file_link(record.platform, file));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Backend HTTP client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Persisted download history
pub mod history;
/// Download orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Platform URL rules
pub mod platform;
/// Job status polling
pub mod poll;
/// Session status log
pub mod status_log;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{HttpJobClient, JobBackend, resolve_file_link};
pub use config::{BackendConfig, Config, HistoryConfig, PollConfig};
pub use error::{Error, PersistenceError, QueryError, Result, SubmitError, ValidationError};
pub use history::{HistoryLoad, HistoryStore};
pub use orchestrator::MediaDownloader;
pub use platform::{PlatformRegistry, PlatformRule};
pub use poll::PollLoop;
pub use status_log::StatusLog;
pub use types::{
    CompletedJob, DownloadRequest, Event, HistoryRecord, JobId, JobStatus, OrchestratorState,
    Platform, Severity, StatusEvent,
};

/// Wait for a termination signal, then shut the downloader down.
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Shutdown cancels any download in flight, so racing this against
/// [`MediaDownloader::download`] lets Ctrl+C end a long poll cleanly.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader, Platform, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default())?;
///
///     let download = downloader.download("https://vm.tiktok.com/ZM123/", Platform::Tiktok);
///     tokio::select! {
///         result = download => println!("{:?}", result.map(|r| r.title)),
///         _ = run_with_shutdown(downloader.clone()) => println!("interrupted"),
///     }
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
