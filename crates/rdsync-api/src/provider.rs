//! RealDebridProvider - ITorrentProvider implementation for the Real-Debrid API
//!
//! Wraps a [`RealDebridClient`] to fulfil the [`ITorrentProvider`] port
//! contract. Errors are returned as `anyhow::Error` wrapping [`ApiError`],
//! so callers can recover the typed error with `downcast_ref::<ApiError>()`.
//!
//! [`ApiError`]: crate::ApiError

use anyhow::Result;
use rdsync_core::domain::{Inventory, TorrentInfo};
use rdsync_core::ports::ITorrentProvider;

use crate::client::RealDebridClient;

/// Torrent provider backed by one Real-Debrid account
#[derive(Debug)]
pub struct RealDebridProvider {
    client: RealDebridClient,
}

impl RealDebridProvider {
    /// Creates a provider from a configured client
    pub fn new(client: RealDebridClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &RealDebridClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl ITorrentProvider for RealDebridProvider {
    async fn list_all(&self) -> Result<Inventory> {
        Ok(self.client.get_all_torrents().await?)
    }

    async fn get_torrent_info(&self, torrent_id: &str) -> Result<TorrentInfo> {
        Ok(self.client.get_torrent_info(torrent_id).await?)
    }

    async fn add_by_hash(&self, hash: &str, file_ids: Option<&[u32]>) -> Result<TorrentInfo> {
        Ok(self.client.add_magnet(hash, file_ids).await?)
    }
}
