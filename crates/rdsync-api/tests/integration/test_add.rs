//! Integration tests for adding torrents and selecting files

use std::time::{Duration, Instant};

use rdsync_api::{client::FileSelection, rate_limit::RateLimiter, ApiError};
use rdsync_core::domain::TorrentStatus;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, ResponseTemplate,
};

use crate::common;

const HASH: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

// ============================================================================
// select_files
// ============================================================================

#[tokio::test]
async fn test_select_files_sends_comma_joined_ids() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("POST"))
        .and(path("/torrents/selectFiles/SEL1"))
        .and(body_string_contains("files=1%2C3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .select_files("SEL1", FileSelection::Ids(vec![1, 3]))
        .await
        .expect("select failed");
}

#[tokio::test]
async fn test_select_files_all() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("POST"))
        .and(path("/torrents/selectFiles/SEL2"))
        .and(body_string_contains("files=all"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .select_files("SEL2", FileSelection::All)
        .await
        .expect("select failed");
}

// ============================================================================
// add_magnet
// ============================================================================

#[tokio::test]
async fn test_add_magnet_sends_magnet_and_returns_info() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("POST"))
        .and(path("/torrents/addMagnet"))
        .and(body_string_contains("magnet="))
        .and(body_string_contains(HASH))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "NEW1",
            "uri": "https://api.real-debrid.com/rest/1.0/torrents/info/NEW1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    common::mount_info(
        &server,
        common::torrent_info_json("NEW1", HASH, "waiting_files_selection"),
    )
    .await;

    let info = client.add_magnet(HASH, None).await.expect("add failed");
    assert_eq!(info.id, "NEW1");
    assert_eq!(info.status, TorrentStatus::WaitingFilesSelection);
}

#[tokio::test]
async fn test_add_magnet_selects_requested_files() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "NEW2").await;
    common::mount_info(&server, common::torrent_info_json("NEW2", HASH, "queued")).await;
    Mock::given(method("POST"))
        .and(path("/torrents/selectFiles/NEW2"))
        .and(body_string_contains("files=1%2C2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .add_magnet(HASH, Some(&[1, 2][..]))
        .await
        .expect("add failed");
}

#[tokio::test]
async fn test_add_magnet_skips_selection_for_empty_file_list() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "NEW3").await;
    common::mount_info(&server, common::torrent_info_json("NEW3", HASH, "queued")).await;
    Mock::given(method("POST"))
        .and(path("/torrents/selectFiles/NEW3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    client.add_magnet(HASH, Some(&[][..])).await.expect("add failed");
}

#[tokio::test]
async fn test_add_magnet_error_payload_is_service_error() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("POST"))
        .and(path("/torrents/addMagnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "infringing_file",
            "error_code": 35
        })))
        .mount(&server)
        .await;

    let err = client.add_magnet(HASH, None).await.unwrap_err();
    assert_eq!(err.code(), Some(35));
    assert_eq!(err.code_description(), Some("Infringing file"));
}

#[tokio::test]
async fn test_add_magnet_select_failure_is_chained() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "NEW4").await;
    common::mount_info(&server, common::torrent_info_json("NEW4", HASH, "queued")).await;
    Mock::given(method("POST"))
        .and(path("/torrents/selectFiles/NEW4"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "parameter_value",
            "error_code": 2
        })))
        .mount(&server)
        .await;

    let err = client.add_magnet(HASH, Some(&[9][..])).await.unwrap_err();
    match &err {
        ApiError::SelectFiles { torrent_id, source } => {
            assert_eq!(torrent_id, "NEW4");
            assert_eq!(source.code(), Some(2));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err
        .to_string()
        .starts_with("Failed to select files for torrent NEW4"));
}

// ============================================================================
// add_magnet_and_wait
// ============================================================================

#[tokio::test]
async fn test_add_magnet_and_wait_returns_when_downloaded() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "W1").await;

    // Two polls report downloading, then downloaded
    Mock::given(method("GET"))
        .and(path("/torrents/info/W1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::torrent_info_json("W1", HASH, "downloading")),
        )
        .up_to_n_times(3)
        .mount(&server)
        .await;
    common::mount_info(&server, common::torrent_info_json("W1", HASH, "downloaded")).await;

    let info = client
        .add_magnet_and_wait(
            HASH,
            None,
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await
        .expect("wait failed");
    assert_eq!(info.status, TorrentStatus::Downloaded);
}

#[tokio::test]
async fn test_add_magnet_and_wait_reports_terminal_failure() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "W2").await;
    common::mount_info(&server, common::torrent_info_json("W2", HASH, "virus")).await;

    let err = client
        .add_magnet_and_wait(
            HASH,
            None,
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::TorrentFailed {
            status: TorrentStatus::Virus,
            ..
        }
    ));
}

#[tokio::test]
async fn test_add_magnet_and_wait_times_out() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "W3").await;
    common::mount_info(&server, common::torrent_info_json("W3", HASH, "downloading")).await;

    let err = client
        .add_magnet_and_wait(
            HASH,
            None,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
    match err {
        ApiError::Timeout { torrent_id, .. } => assert_eq!(torrent_id, "W3"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_add_magnet_and_wait_uses_add_details_as_first_check() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "W4").await;
    Mock::given(method("GET"))
        .and(path("/torrents/info/W4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::torrent_info_json("W4", HASH, "downloaded")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let info = client
        .add_magnet_and_wait(
            HASH,
            None,
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await
        .expect("wait failed");
    assert_eq!(info.status, TorrentStatus::Downloaded);
}

#[tokio::test]
async fn test_add_magnet_and_wait_never_sleeps_past_timeout() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_add_magnet(&server, "W5").await;
    common::mount_info(&server, common::torrent_info_json("W5", HASH, "downloading")).await;

    let begin = Instant::now();
    let err = client
        .add_magnet_and_wait(
            HASH,
            None,
            Duration::from_secs(30),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout { .. }));
    assert!(
        begin.elapsed() < Duration::from_secs(5),
        "elapsed = {:?}",
        begin.elapsed()
    );
}

// ============================================================================
// Rate limiting
// ============================================================================

#[tokio::test]
async fn test_add_magnet_waits_on_torrents_limiter() {
    let (server, client) = common::setup_api_mock_with_limiters(
        RateLimiter::per_minute(6000),
        RateLimiter::new(1, Duration::from_secs(2)),
    )
    .await;
    common::mount_add_magnet(&server, "RL1").await;
    common::mount_info(&server, common::torrent_info_json("RL1", HASH, "downloaded")).await;

    let begin = Instant::now();
    client.add_magnet(HASH, None).await.expect("first add failed");
    assert!(begin.elapsed() < Duration::from_secs(1));

    client.add_magnet(HASH, None).await.expect("second add failed");
    let elapsed = begin.elapsed();
    assert!(elapsed >= Duration::from_millis(1900), "elapsed = {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed = {elapsed:?}");
}

#[tokio::test]
async fn test_add_magnet_is_gated_by_general_limiter() {
    // Each add spends two general tokens: addMagnet, then the info fetch
    let (server, client) = common::setup_api_mock_with_limiters(
        RateLimiter::new(2, Duration::from_secs(2)),
        RateLimiter::per_minute(6000),
    )
    .await;
    common::mount_add_magnet(&server, "RL2").await;
    common::mount_info(&server, common::torrent_info_json("RL2", HASH, "downloaded")).await;

    let begin = Instant::now();
    client.add_magnet(HASH, None).await.expect("first add failed");
    client.add_magnet(HASH, None).await.expect("second add failed");

    let elapsed = begin.elapsed();
    assert!(elapsed >= Duration::from_millis(1900), "elapsed = {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed = {elapsed:?}");
}
