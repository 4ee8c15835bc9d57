//! End-to-end tests against a mock HTTP backend

mod common;

use common::*;
use media_dl::{Error, Event, OrchestratorState, Platform, Severity, ValidationError};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_spotify_download_end_to_end() {
    let (server, downloader, _temp_dir) = create_downloader().await;

    Mock::given(method("POST"))
        .and(path("/download"))
        .and(body_json(json!({
            "url": "https://open.spotify.com/track/abc",
            "platform": "spotify"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "download_id": "1" })))
        .expect(1)
        .mount(&server)
        .await;
    mount_status_times(
        &server,
        "1",
        json!({ "status": "processing", "message": "Downloading..." }),
        2,
        1,
    )
    .await;
    mount_status(
        &server,
        "1",
        json!({
            "status": "completed",
            "title": "Song",
            "output_path": "/downloads/spotify",
            "files": ["song.mp3"]
        }),
    )
    .await;

    let record = downloader
        .download("https://open.spotify.com/track/abc", Platform::Spotify)
        .await
        .unwrap();

    let history = downloader.history().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0], record);
    assert_eq!(record.title, "Song");
    assert_eq!(record.platform, Platform::Spotify);
    assert_eq!(record.files, vec!["song.mp3".to_string()]);

    assert_eq!(
        severities(&downloader),
        vec![Severity::Info, Severity::Info, Severity::Success]
    );

    // one submission plus three status checks
    assert_eq!(request_count(&server).await, 4);
    assert!(downloader.is_idle());

    let link = downloader.file_link(record.platform, &record.files[0]);
    assert_eq!(link, format!("{}/download-file/spotify/song.mp3", server.uri()));
}

#[tokio::test]
async fn test_empty_url_makes_no_network_call() {
    let (server, downloader, _temp_dir) = create_downloader().await;

    let err = downloader
        .download("", Platform::Spotify)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(ValidationError::EmptyUrl)));
    assert_eq!(severities(&downloader), vec![Severity::Error]);
    assert_eq!(request_count(&server).await, 0);
    assert_eq!(downloader.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_mismatched_platform_makes_no_network_call() {
    let (server, downloader, _temp_dir) = create_downloader().await;

    let err = downloader
        .download(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Platform::Spotify,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::PlatformMismatch { .. })
    ));
    assert_eq!(severities(&downloader), vec![Severity::Error]);
    assert_eq!(request_count(&server).await, 0);
    assert!(downloader.history().await.is_empty());
}

#[tokio::test]
async fn test_backend_rejection_is_reported() {
    let (server, downloader, _temp_dir) = create_downloader().await;

    Mock::given(method("POST"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Unsupported URL" })),
        )
        .mount(&server)
        .await;

    let err = downloader
        .download("https://vm.tiktok.com/ZMabc123/", Platform::Tiktok)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Submit(ref e) if e.reason == "Unsupported URL"));
    let log = downloader.status_log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].message, "Failed to start download: Unsupported URL");
    assert!(downloader.is_idle());
}

#[tokio::test]
async fn test_status_failure_ends_cycle_without_record() {
    let (server, downloader, temp_dir) = create_downloader().await;

    mount_submit(&server, json!(5)).await;
    mount_status_times(&server, "5", json!({ "status": "queued" }), 1, 1).await;
    Mock::given(method("GET"))
        .and(path("/status/5"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "database locked" })))
        .with_priority(2)
        .mount(&server)
        .await;

    let err = downloader
        .download("https://x.com/someone/status/1234567890", Platform::Twitter)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Query(_)));
    assert_eq!(
        severities(&downloader),
        vec![Severity::Info, Severity::Error]
    );
    assert!(downloader.history().await.is_empty());
    assert!(!temp_dir.path().join("history.json").exists());
    assert_eq!(downloader.state(), OrchestratorState::Idle);
}

#[tokio::test]
async fn test_backend_job_error_is_reported() {
    let (server, downloader, _temp_dir) = create_downloader().await;

    mount_submit(&server, json!("abc")).await;
    mount_status(
        &server,
        "abc",
        json!({ "status": "error", "error": "Video unavailable" }),
    )
    .await;

    let err = downloader
        .download("https://youtu.be/dQw4w9WgXcQ", Platform::YoutubeAudio)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::JobFailed(ref m) if m == "Video unavailable"));
    let log = downloader.status_log();
    assert_eq!(log.last().unwrap().message, "Download failed: Video unavailable");
}

#[tokio::test]
async fn test_history_update_event_carries_record() {
    let (server, downloader, _temp_dir) = create_downloader().await;
    let mut events = downloader.subscribe();

    mount_submit(&server, json!("9")).await;
    mount_status(
        &server,
        "9",
        json!({ "status": "completed", "title": "Clip", "files": ["clip.mp4"] }),
    )
    .await;

    downloader
        .download(
            "https://www.youtube.com/shorts/abcdEFGH123",
            Platform::YoutubeVideo,
        )
        .await
        .unwrap();

    let mut updated = None;
    let mut cleared = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::HistoryUpdated { record, len } => updated = Some((record, len)),
            Event::ClearInput => cleared = true,
            _ => {}
        }
    }

    let (record, len) = updated.expect("expected a history update");
    assert_eq!(record.title, "Clip");
    assert_eq!(record.platform, Platform::YoutubeVideo);
    assert_eq!(len, 1);
    assert!(cleared);
}
