use super::test_helpers::{ScriptedBackend, completed, create_test_downloader, test_config};
use super::*;
use crate::error::{Error, QueryError, ValidationError};
use crate::types::{JobStatus, OrchestratorState, Severity};
use std::time::Duration;


const SPOTIFY_TRACK: &str = "https://open.spotify.com/track/abc";
const YOUTUBE_WATCH: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

fn severities(downloader: &MediaDownloader) -> Vec<Severity> {
    downloader
        .status_log()
        .into_iter()
        .map(|e| e.severity)
        .collect()
}

/// Wait until the downloader is polling a job
async fn wait_for_polling(downloader: &MediaDownloader) {
    let mut state = downloader.watch_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| matches!(s, OrchestratorState::Polling { .. })),
    )
    .await
    .expect("download never reached polling")
    .unwrap();
}
