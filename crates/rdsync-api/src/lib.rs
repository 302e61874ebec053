//! rdsync API - Real-Debrid REST client
//!
//! Provides an async client for:
//! - Paginated torrent listing and per-torrent details
//! - Adding torrents by info-hash and selecting their files
//! - Token-bucket rate limiting per operation class
//!
//! ## Modules
//!
//! - [`client`] - HTTP client for the REST API
//! - [`provider`] - [`ITorrentProvider`](rdsync_core::ports::ITorrentProvider) adapter
//! - [`rate_limit`] - Token bucket used to stay within the service quotas

pub mod client;
pub mod provider;
pub mod rate_limit;

use rdsync_core::domain::error_codes;
use thiserror::Error;

/// Errors that can occur when communicating with the remote service
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure or request timeout
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status without a service error payload
    #[error("HTTP error occurred: {status}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The service answered with an `{error, error_code}` payload
    #[error("{}", service_message(.message, .code))]
    Service { code: Option<i64>, message: String },

    /// The torrent was added but selecting its files failed
    #[error("Failed to select files for torrent {torrent_id}: {source}")]
    SelectFiles {
        torrent_id: String,
        #[source]
        source: Box<ApiError>,
    },

    /// Polling for a terminal status exceeded its bound
    #[error("Timeout waiting for torrent {torrent_id} to finish after {waited_secs}s")]
    Timeout { torrent_id: String, waited_secs: u64 },

    /// Polling observed a terminal failure status
    #[error("Torrent {torrent_id} failed with status: {status}")]
    TorrentFailed {
        torrent_id: String,
        status: rdsync_core::domain::TorrentStatus,
    },

    /// A success response whose body could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Numeric service error code, if the service reported one
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Service { code, .. } => *code,
            Self::SelectFiles { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Human-readable description of [`code`](Self::code) from the error table
    pub fn code_description(&self) -> Option<&'static str> {
        self.code().and_then(error_codes::describe)
    }
}

fn service_message(message: &str, code: &Option<i64>) -> String {
    error_codes::annotate(message, *code)
}
