//! Domain entities
//!
//! - Torrent listing entries and detailed torrent information
//! - Per-account inventories keyed by content hash
//! - Transfer plans computed between two inventories
//! - The remote service's error-code table

pub mod error_codes;
pub mod inventory;
pub mod torrent;

pub use inventory::{Inventory, TransferPlan};
pub use torrent::{format_size, Torrent, TorrentFile, TorrentInfo, TorrentStatus};
