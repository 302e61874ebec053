//! Port definitions
//!
//! - [`ITorrentProvider`] - the remote account operations the sync engine needs

pub mod torrent_provider;

pub use torrent_provider::ITorrentProvider;
