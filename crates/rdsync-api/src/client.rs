//! Real-Debrid REST client
//!
//! Provides a typed HTTP client for the torrent endpoints of the Real-Debrid
//! API. Handles authentication, rate limiting, JSON deserialization and the
//! translation of error payloads into [`ApiError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rdsync_api::client::RealDebridClient;
//! use rdsync_core::config::ApiConfig;
//!
//! # async fn example() -> Result<(), rdsync_api::ApiError> {
//! let client = RealDebridClient::new("account-token", &ApiConfig::default())?;
//! let inventory = client.get_all_torrents().await?;
//! println!("{} torrents", inventory.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use rdsync_core::config::ApiConfig;
use rdsync_core::domain::{Inventory, Torrent, TorrentInfo};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::rate_limit::RateLimiter;
use crate::ApiError;

/// Response header carrying the total number of torrents on the account
const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

// ============================================================================
// API payload types
// ============================================================================

/// Error payload the service returns on failures
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
    #[serde(default)]
    error_code: Option<i64>,
}

/// Response from `POST /torrents/addMagnet`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AddMagnetResponse {
    Added { id: String },
    Failed(ErrorPayload),
}

/// Which files of a torrent to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    /// Every file in the torrent
    All,
    /// Only the listed file IDs
    Ids(Vec<u32>),
}

impl FileSelection {
    /// Value of the `files` form field: `all` or comma-joined IDs
    pub fn as_form_value(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Ids(ids) => ids
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Magnet URI for an info-hash
pub fn magnet_uri(hash: &str) -> String {
    format!("magnet:?xt=urn:btih:{hash}")
}

/// Strips the URL (and with it the auth token) from transport errors.
fn transport(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.without_url())
}

/// Reads a success body as JSON.
///
/// Read failures are transport errors; a body that does not decode is
/// [`ApiError::InvalidResponse`].
async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
    let body = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidResponse(format!("failed to decode {what}: {e}")))
}

/// Builds the error for a non-success response.
///
/// A parseable `{error, error_code}` body becomes [`ApiError::Service`],
/// anything else [`ApiError::Status`].
fn error_from_response(status: StatusCode, body: String) -> ApiError {
    match serde_json::from_str::<ErrorPayload>(&body) {
        Ok(payload) => ApiError::Service {
            code: payload.error_code,
            message: payload.error,
        },
        Err(_) => ApiError::Status { status, body },
    }
}

// ============================================================================
// RealDebridClient
// ============================================================================

/// HTTP client bound to one Real-Debrid account
///
/// Owns two [`RateLimiter`]s: one gating every call, and a tighter one that
/// additionally gates torrent additions. Clients are not shared between jobs.
pub struct RealDebridClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Account API token, sent as the `auth_token` query parameter
    token: String,
    /// Page size for [`get_all_torrents`](Self::get_all_torrents)
    page_size: u32,
    /// Limiter for every API call
    api_limiter: RateLimiter,
    /// Limiter for `addMagnet`, acquired after `api_limiter`
    torrents_limiter: RateLimiter,
}

impl std::fmt::Debug for RealDebridClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealDebridClient")
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("api_limiter", &self.api_limiter)
            .field("torrents_limiter", &self.torrents_limiter)
            .finish_non_exhaustive()
    }
}

impl RealDebridClient {
    /// Creates a client for one account
    ///
    /// # Arguments
    /// * `token` - The account's API token
    /// * `config` - Endpoint, timeout, page size and rate limits
    pub fn new(token: impl Into<String>, config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: config.fetch_torrents_page_size.max(1),
            api_limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
            torrents_limiter: RateLimiter::per_minute(config.torrents_rate_limit_per_minute),
        })
    }

    /// Replaces both rate limiters
    ///
    /// # Arguments
    /// * `api` - Limiter for every call
    /// * `torrents` - Additional limiter for torrent additions
    pub fn with_rate_limiters(mut self, api: RateLimiter, torrents: RateLimiter) -> Self {
        self.api_limiter = api;
        self.torrents_limiter = torrents;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. `"/torrents"`)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .query(&[("auth_token", self.token.as_str())])
    }

    /// Acquires the general limiter, then sends the request
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.api_limiter.acquire().await;
        self.execute(request).await
    }

    /// Sends the request and maps non-success statuses to errors
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_from_response(status, body);
        warn!(status = status.as_u16(), error = %err, "API request failed");
        Err(err)
    }

    // ========================================================================
    // Listing
    // ========================================================================

    /// Returns the total number of torrents on the account
    ///
    /// Probes `GET /torrents?page=1&limit=1` and reads the `X-Total-Count`
    /// header; a missing or unparseable header counts as zero.
    pub async fn get_total_torrents(&self) -> Result<u64, ApiError> {
        let response = self
            .send(
                self.request(Method::GET, "/torrents")
                    .query(&[("page", 1u32), ("limit", 1u32)]),
            )
            .await?;

        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        debug!(total, "Fetched total torrent count");
        Ok(total)
    }

    /// Fetches one page of the torrent listing
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `limit` - Page size
    ///
    /// # Returns
    /// The torrents on that page in service order; empty on HTTP 204
    pub async fn get_torrents_page(&self, page: u32, limit: u32) -> Result<Vec<Torrent>, ApiError> {
        let page = page.max(1);
        let response = self
            .send(
                self.request(Method::GET, "/torrents")
                    .query(&[("page", page), ("limit", limit)]),
            )
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }

        let torrents: Vec<Torrent> = read_json(response, "torrent listing").await?;
        debug!(page, count = torrents.len(), "Fetched torrent page");
        Ok(torrents)
    }

    /// Fetches every torrent on the account, keyed by info-hash
    ///
    /// One count probe, then `ceil(total / page_size)` sequential page fetches.
    pub async fn get_all_torrents(&self) -> Result<Inventory, ApiError> {
        let total = self.get_total_torrents().await?;
        let page_size = u64::from(self.page_size);
        let pages = total.div_ceil(page_size);

        let mut inventory = Inventory::new();
        for page in 1..=pages {
            let page = u32::try_from(page).map_err(|_| {
                ApiError::InvalidResponse(format!("page number {page} out of range"))
            })?;
            inventory.extend(self.get_torrents_page(page, self.page_size).await?);
        }

        debug!(total, pages, unique = inventory.len(), "Fetched all torrents");
        Ok(inventory)
    }

    // ========================================================================
    // Details and file selection
    // ========================================================================

    /// Fetches full details, including files, for one torrent
    ///
    /// # Arguments
    /// * `torrent_id` - The account-local torrent identifier
    pub async fn get_torrent_info(&self, torrent_id: &str) -> Result<TorrentInfo, ApiError> {
        let path = format!("/torrents/info/{torrent_id}");
        let response = self.send(self.request(Method::GET, &path)).await?;
        read_json(response, "torrent info").await
    }

    /// Selects which files of a torrent to download
    ///
    /// # Arguments
    /// * `torrent_id` - The account-local torrent identifier
    /// * `selection` - `all` or a list of file IDs
    pub async fn select_files(
        &self,
        torrent_id: &str,
        selection: FileSelection,
    ) -> Result<(), ApiError> {
        let path = format!("/torrents/selectFiles/{torrent_id}");
        let files = selection.as_form_value();
        self.send(
            self.request(Method::POST, &path)
                .form(&[("files", files.as_str())]),
        )
        .await?;
        debug!(torrent_id, files = %files, "Selected torrent files");
        Ok(())
    }

    // ========================================================================
    // Adding torrents
    // ========================================================================

    /// Adds a torrent by info-hash
    ///
    /// Acquires the general limiter, then the torrents limiter. On success the
    /// new torrent's details are fetched; when `file_ids` is given and not
    /// empty, those files are then selected. A failed selection is reported as
    /// [`ApiError::SelectFiles`] even though the torrent was added.
    ///
    /// # Arguments
    /// * `hash` - Info-hash of the torrent
    /// * `file_ids` - Files to select after adding
    ///
    /// # Returns
    /// The torrent details as fetched right after adding
    pub async fn add_magnet(
        &self,
        hash: &str,
        file_ids: Option<&[u32]>,
    ) -> Result<TorrentInfo, ApiError> {
        self.api_limiter.acquire().await;
        self.torrents_limiter.acquire().await;

        let magnet = magnet_uri(hash);
        let response = self
            .execute(
                self.request(Method::POST, "/torrents/addMagnet")
                    .form(&[("magnet", magnet.as_str())]),
            )
            .await?;

        let added: AddMagnetResponse = read_json(response, "addMagnet response").await?;
        let torrent_id = match added {
            AddMagnetResponse::Added { id } => id,
            AddMagnetResponse::Failed(payload) => {
                return Err(ApiError::Service {
                    code: payload.error_code,
                    message: payload.error,
                })
            }
        };
        debug!(hash, torrent_id = %torrent_id, "Added magnet");

        let info = self.get_torrent_info(&torrent_id).await?;

        if let Some(ids) = file_ids.filter(|ids| !ids.is_empty()) {
            self.select_files(&torrent_id, FileSelection::Ids(ids.to_vec()))
                .await
                .map_err(|source| ApiError::SelectFiles {
                    torrent_id: torrent_id.clone(),
                    source: Box::new(source),
                })?;
        }

        Ok(info)
    }

    /// Adds a torrent and polls until it is downloaded
    ///
    /// The details returned by [`add_magnet`](Self::add_magnet) are the first
    /// status check. No sleep extends past `timeout`.
    ///
    /// # Arguments
    /// * `hash` - Info-hash of the torrent
    /// * `file_ids` - Files to select after adding
    /// * `poll_interval` - Delay between status checks
    /// * `timeout` - Upper bound on the total polling time
    ///
    /// # Returns
    /// The torrent details once the status is `downloaded`. Terminal failure
    /// statuses yield [`ApiError::TorrentFailed`], an exceeded bound
    /// [`ApiError::Timeout`].
    pub async fn add_magnet_and_wait(
        &self,
        hash: &str,
        file_ids: Option<&[u32]>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<TorrentInfo, ApiError> {
        let mut info = self.add_magnet(hash, file_ids).await?;
        let torrent_id = info.id.clone();
        let start = Instant::now();

        loop {
            if info.status.is_terminal_success() {
                return Ok(info);
            }
            if info.status.is_terminal_failure() {
                return Err(ApiError::TorrentFailed {
                    torrent_id,
                    status: info.status,
                });
            }

            let waited = start.elapsed();
            if waited >= timeout {
                return Err(ApiError::Timeout {
                    torrent_id,
                    waited_secs: waited.as_secs(),
                });
            }

            debug!(
                torrent_id = %torrent_id,
                status = %info.status,
                progress = info.progress,
                "Waiting for torrent to finish"
            );
            tokio::time::sleep(poll_interval.min(timeout - waited)).await;
            info = self.get_torrent_info(&torrent_id).await?;
        }
    }
}
