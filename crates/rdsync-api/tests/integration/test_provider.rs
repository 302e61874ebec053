//! Integration tests for the ITorrentProvider adapter

use rdsync_api::{provider::RealDebridProvider, ApiError};
use rdsync_core::ports::ITorrentProvider;
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_provider_lists_inventory() {
    let (server, client) = common::setup_api_mock(10).await;
    common::mount_total_count(&server, 2).await;
    common::mount_page(
        &server,
        1,
        10,
        serde_json::json!([
            common::torrent_json("P1", "hash-1"),
            common::torrent_json("P2", "hash-2"),
        ]),
    )
    .await;

    let provider = RealDebridProvider::new(client);
    let inventory = provider.list_all().await.expect("list failed");
    assert_eq!(inventory.len(), 2);
    assert!(inventory.contains("hash-1"));
    assert!(inventory.contains("hash-2"));
}

#[tokio::test]
async fn test_provider_add_by_hash_returns_info() {
    let (server, client) = common::setup_api_mock(10).await;
    common::mount_add_magnet(&server, "ADDED").await;
    common::mount_info(&server, common::torrent_info_json("ADDED", "hash-x", "queued")).await;
    common::mount_select_files(&server, "ADDED").await;

    let provider = RealDebridProvider::new(client);
    let info = provider
        .add_by_hash("hash-x", Some(&[1][..]))
        .await
        .expect("add failed");
    assert_eq!(info.id, "ADDED");
    assert_eq!(info.hash, "hash-x");
}

#[tokio::test]
async fn test_provider_errors_downcast_to_api_error() {
    let (server, client) = common::setup_api_mock(10).await;
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "bad_token",
            "error_code": 8
        })))
        .mount(&server)
        .await;

    let provider = RealDebridProvider::new(client);
    let err = provider.list_all().await.unwrap_err();
    let api_err = err
        .downcast_ref::<ApiError>()
        .expect("error should wrap ApiError");
    assert_eq!(api_err.code(), Some(8));
    assert_eq!(err.to_string(), "bad_token (Bad token)");
}
