//! Common test utilities for media-dl end-to-end tests

#![allow(dead_code)]

use media_dl::{Config, MediaDownloader, Severity};
use serde_json::{Value, json};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointed at `server` with a fast poll interval and history under `dir`
pub fn config_for(server: &MockServer, dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.backend.base_url = server.uri();
    config.backend.request_timeout = Duration::from_secs(5);
    config.polling.interval = Duration::from_millis(10);
    config.history.path = dir.path().join("history.json");
    config
}

/// Start a mock backend and a downloader talking to it over HTTP.
/// Returns the tempdir too (it must be kept alive).
pub async fn create_downloader() -> (MockServer, MediaDownloader, TempDir) {
    let server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let downloader =
        MediaDownloader::new(config_for(&server, &temp_dir)).expect("failed to create downloader");
    (server, downloader, temp_dir)
}

/// Accept submissions with the given job id
pub async fn mount_submit(server: &MockServer, download_id: Value) {
    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "download_id": download_id })))
        .mount(server)
        .await;
}

/// Answer `/status/{id}` with `body` for the next `times` checks
///
/// Lower `priority` values match first; once `times` is used up the next
/// matching mock answers, so a sequence is scripted with rising priorities.
pub async fn mount_status_times(server: &MockServer, id: &str, body: Value, times: u64, priority: u8) {
    Mock::given(method("GET"))
        .and(path(format!("/status/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(times)
        .with_priority(priority)
        .mount(server)
        .await;
}

/// Answer every `/status/{id}` check with `body`
pub async fn mount_status(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/status/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .with_priority(10)
        .mount(server)
        .await;
}

/// Number of requests the mock backend has seen
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}

/// Severities of the downloader's status log, oldest first
pub fn severities(downloader: &MediaDownloader) -> Vec<Severity> {
    downloader
        .status_log()
        .into_iter()
        .map(|e| e.severity)
        .collect()
}
