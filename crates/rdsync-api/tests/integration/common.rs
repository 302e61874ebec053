//! Shared test helpers for Real-Debrid API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary endpoints and returns a client pointing at the mock server.

use rdsync_api::client::RealDebridClient;
use rdsync_api::rate_limit::RateLimiter;
use rdsync_core::config::ApiConfig;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-account-token";

/// Starts a mock server and returns a client configured against it.
///
/// The client uses generous rate limits so tests never wait on the bucket.
pub async fn setup_api_mock(page_size: u32) -> (MockServer, RealDebridClient) {
    let server = MockServer::start().await;

    let config = ApiConfig {
        base_url: server.uri(),
        rate_limit_per_minute: 6000,
        torrents_rate_limit_per_minute: 6000,
        timeout_secs: 5,
        fetch_torrents_page_size: page_size,
        disable_http_logging: true,
    };
    let client = RealDebridClient::new(TEST_TOKEN, &config).expect("build client");

    (server, client)
}

/// Like [`setup_api_mock`], with the given rate limiters installed.
pub async fn setup_api_mock_with_limiters(
    api: RateLimiter,
    torrents: RateLimiter,
) -> (MockServer, RealDebridClient) {
    let (server, client) = setup_api_mock(100).await;
    (server, client.with_rate_limiters(api, torrents))
}

/// A listing entry as the service returns it.
pub fn torrent_json(id: &str, hash: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "filename": format!("{id}.mkv"),
        "hash": hash,
        "bytes": 1_073_741_824_u64,
        "host": "real-debrid.com",
        "split": 2000,
        "progress": 100,
        "status": "downloaded",
        "added": "2024-03-01T10:00:00.000Z",
        "links": [format!("https://real-debrid.com/d/{id}")],
        "ended": "2024-03-01T10:05:00.000Z"
    })
}

/// A detail record with two files, the first one selected.
pub fn torrent_info_json(id: &str, hash: &str, status: &str) -> serde_json::Value {
    let progress = if status == "downloaded" { 100 } else { 10 };
    serde_json::json!({
        "id": id,
        "filename": format!("{id}.mkv"),
        "original_filename": format!("{id}.mkv"),
        "hash": hash,
        "bytes": 1024,
        "original_bytes": 3072,
        "host": "real-debrid.com",
        "split": 2000,
        "progress": progress,
        "status": status,
        "added": "2024-03-01T10:00:00.000Z",
        "files": [
            { "id": 1, "path": "/movie.mkv", "bytes": 1024, "selected": 1 },
            { "id": 2, "path": "/sample.mkv", "bytes": 2048, "selected": 0 }
        ],
        "links": []
    })
}

/// Mounts the `page=1&limit=1` count probe with an `X-Total-Count` header.
pub async fn mount_total_count(server: &MockServer, total: u64) {
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .and(query_param("auth_token", TEST_TOKEN))
        .and(query_param("page", "1"))
        .and(query_param("limit", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Total-Count", total.to_string().as_str())
                .set_body_json(serde_json::json!([])),
        )
        .mount(server)
        .await;
}

/// Mounts one listing page.
pub async fn mount_page(server: &MockServer, page: u32, limit: u32, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/torrents"))
        .and(query_param("page", page.to_string().as_str()))
        .and(query_param("limit", limit.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the detail endpoint for one torrent.
pub async fn mount_info(server: &MockServer, info: serde_json::Value) {
    let id = info["id"].as_str().expect("info needs an id").to_string();
    Mock::given(method("GET"))
        .and(path(format!("/torrents/info/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(info))
        .mount(server)
        .await;
}

/// Mounts a successful `addMagnet` returning `id`.
pub async fn mount_add_magnet(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path("/torrents/addMagnet"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": id,
            "uri": format!("https://api.real-debrid.com/rest/1.0/torrents/info/{id}")
        })))
        .mount(server)
        .await;
}

/// Mounts a successful `selectFiles` for one torrent.
pub async fn mount_select_files(server: &MockServer, id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/torrents/selectFiles/{id}")))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}
