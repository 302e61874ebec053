//! Torrent provider port (driven/secondary port)
//!
//! The sync engine reaches a remote account only through this trait. The
//! production implementation lives in `rdsync-api` and talks HTTP; tests use
//! in-memory doubles.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific.
//!   Adapters wrap their typed error so callers can `downcast_ref` it.
//! - Uses `#[async_trait]` for async trait methods.

use crate::domain::{Inventory, TorrentInfo};

/// Remote account operations used by a sync pass
#[async_trait::async_trait]
pub trait ITorrentProvider: Send + Sync {
    /// Lists every torrent on the account, keyed by content hash
    async fn list_all(&self) -> anyhow::Result<Inventory>;

    /// Fetches full details, including the file list, for one torrent
    ///
    /// # Arguments
    /// * `torrent_id` - The account-local torrent identifier
    async fn get_torrent_info(&self, torrent_id: &str) -> anyhow::Result<TorrentInfo>;

    /// Adds a torrent by content hash and optionally selects files on it
    ///
    /// # Arguments
    /// * `hash` - Content hash to add
    /// * `file_ids` - Files to select after adding; `None` leaves selection untouched
    ///
    /// # Returns
    /// The full state of the newly added torrent
    async fn add_by_hash(&self, hash: &str, file_ids: Option<&[u32]>)
        -> anyhow::Result<TorrentInfo>;
}
