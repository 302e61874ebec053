//! Integration tests for listing and detail endpoints

use rdsync_api::{client::RealDebridClient, ApiError};
use rdsync_core::{config::ApiConfig, domain::TorrentStatus};
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::common;

// ============================================================================
// Total count
// ============================================================================

#[tokio::test]
async fn test_get_total_torrents_reads_header() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_total_count(&server, 42).await;

    let total = client.get_total_torrents().await.expect("count failed");
    assert_eq!(total, 42);
}

#[tokio::test]
async fn test_get_total_torrents_missing_header_is_zero() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let total = client.get_total_torrents().await.expect("count failed");
    assert_eq!(total, 0);
}

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_get_torrents_page_parses_entries() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_page(
        &server,
        3,
        50,
        serde_json::json!([
            common::torrent_json("AAA", "hash-a"),
            common::torrent_json("BBB", "hash-b"),
        ]),
    )
    .await;

    let page = client.get_torrents_page(3, 50).await.expect("page failed");
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "AAA");
    assert_eq!(page[0].hash, "hash-a");
    assert_eq!(page[0].status, TorrentStatus::Downloaded);
    assert!(page[0].is_ready_for_sync());
}

#[tokio::test]
async fn test_get_torrents_page_no_content_is_empty() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let page = client.get_torrents_page(1, 100).await.expect("page failed");
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_get_all_torrents_fetches_every_page() {
    let (server, client) = common::setup_api_mock(2).await;
    common::mount_total_count(&server, 5).await;
    common::mount_page(
        &server,
        1,
        2,
        serde_json::json!([
            common::torrent_json("T1", "h1"),
            common::torrent_json("T2", "h2"),
        ]),
    )
    .await;
    common::mount_page(
        &server,
        2,
        2,
        serde_json::json!([
            common::torrent_json("T3", "h3"),
            common::torrent_json("T4", "h4"),
        ]),
    )
    .await;
    common::mount_page(
        &server,
        3,
        2,
        serde_json::json!([common::torrent_json("T5", "h5")]),
    )
    .await;

    let inventory = client.get_all_torrents().await.expect("listing failed");
    assert_eq!(inventory.len(), 5);
    for hash in ["h1", "h2", "h3", "h4", "h5"] {
        assert!(inventory.contains(hash), "missing {hash}");
    }
    assert_eq!(inventory.get("h3").map(|t| t.id.as_str()), Some("T3"));
}

#[tokio::test]
async fn test_get_all_torrents_empty_account() {
    let (server, client) = common::setup_api_mock(2).await;
    common::mount_total_count(&server, 0).await;

    let inventory = client.get_all_torrents().await.expect("listing failed");
    assert!(inventory.is_empty());
}

#[tokio::test]
async fn test_unknown_status_does_not_break_listing() {
    let (server, client) = common::setup_api_mock(100).await;
    let mut entry = common::torrent_json("NEW", "hash-new");
    entry["status"] = serde_json::json!("some_future_status");
    common::mount_page(&server, 1, 100, serde_json::json!([entry])).await;

    let page = client.get_torrents_page(1, 100).await.expect("page failed");
    assert_eq!(page[0].status, TorrentStatus::Unknown);
}

// ============================================================================
// Details
// ============================================================================

#[tokio::test]
async fn test_get_torrent_info_returns_files() {
    let (server, client) = common::setup_api_mock(100).await;
    common::mount_info(
        &server,
        common::torrent_info_json("INFO1", "hash-info", "downloaded"),
    )
    .await;

    let info = client.get_torrent_info("INFO1").await.expect("info failed");
    assert_eq!(info.hash, "hash-info");
    assert_eq!(info.files.len(), 2);
    assert_eq!(info.selected_file_ids(), vec![1]);
    assert_eq!(info.original_bytes, 3072);
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_service_error_payload_is_typed() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents/info/MISSING"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": "unknown_ressource",
            "error_code": 7
        })))
        .mount(&server)
        .await;

    let err = client.get_torrent_info("MISSING").await.unwrap_err();
    match &err {
        ApiError::Service { code, message } => {
            assert_eq!(*code, Some(7));
            assert_eq!(message, "unknown_ressource");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "unknown_ressource (Resource not found)");
}

#[tokio::test]
async fn test_http_error_without_payload_is_status_error() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.get_total_torrents().await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_error_does_not_leak_token() {
    let config = ApiConfig {
        base_url: "http://127.0.0.1:1".into(),
        timeout_secs: 2,
        ..ApiConfig::default()
    };
    let client = RealDebridClient::new(common::TEST_TOKEN, &config).unwrap();

    let err = client.get_total_torrents().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(!err.to_string().contains(common::TEST_TOKEN));
}

#[tokio::test]
async fn test_undecodable_page_is_invalid_response() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let err = client.get_torrents_page(1, 100).await.unwrap_err();
    match &err {
        ApiError::InvalidResponse(msg) => assert!(msg.contains("torrent listing")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("Invalid response"));
}

#[tokio::test]
async fn test_undecodable_info_is_invalid_response() {
    let (server, client) = common::setup_api_mock(100).await;
    Mock::given(method("GET"))
        .and(path("/torrents/info/BROKEN"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 5 })),
        )
        .mount(&server)
        .await;

    let err = client.get_torrent_info("BROKEN").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
}
