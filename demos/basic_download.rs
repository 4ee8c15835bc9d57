//! Basic download example
//!
//! Demonstrates the core flow of media-dl:
//! - Pointing the downloader at a backend
//! - Subscribing to events
//! - Submitting one URL and waiting for the job to finish
//! - Printing the resulting file links
//!
//! Run against a local backend:
//!
//! ```bash
//! cargo run --example basic_download -- https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC
//! ```

use media_dl::config::{BackendConfig, Config, HistoryConfig, PollConfig};
use media_dl::{Event, MediaDownloader, OrchestratorState, Platform, Severity};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC".to_string());

    let config = Config {
        backend: BackendConfig {
            base_url: "http://localhost:8000".to_string(),
            ..Default::default()
        },
        polling: PollConfig {
            interval: Duration::from_millis(500),
            max_ticks: Some(600),
        },
        history: HistoryConfig {
            path: "demo-history.json".into(),
            ..Default::default()
        },
    };

    let downloader = MediaDownloader::new(config)?;

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Status(status) => {
                    let marker = match status.severity {
                        Severity::Info => "·",
                        Severity::Success => "✓",
                        Severity::Error => "✗",
                    };
                    println!("{} {}", marker, status.message);
                }
                Event::StateChanged {
                    state: OrchestratorState::Polling { job_id },
                } => {
                    println!("Polling job {}", job_id);
                }
                _ => {}
            }
        }
    });

    match downloader.download(&url, Platform::Spotify).await {
        Ok(record) => {
            println!("\nDownloaded \"{}\"", record.title);
            for file in &record.files {
                println!("  {}", downloader.file_link(record.platform, file));
            }
        }
        Err(e) => eprintln!("\nDownload did not complete: {}", e),
    }

    Ok(())
}
