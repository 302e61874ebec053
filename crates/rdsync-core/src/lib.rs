//! rdsync Core - Domain types and configuration
//!
//! This crate contains the pieces shared by every other rdsync crate:
//! - **Domain entities** - `Torrent`, `TorrentInfo`, `TorrentFile`, `Inventory`, `TransferPlan`
//! - **Port definitions** - `ITorrentProvider`, the boundary the sync engine talks through
//! - **Configuration** - typed YAML configuration with validation and a builder
//! - **Events** - names of the structured log events emitted across the workspace
//!
//! # Architecture
//!
//! The domain module is pure data with no I/O. Ports define trait interfaces
//! that adapter crates (`rdsync-api`) implement, and the sync crate consumes.

pub mod config;
pub mod domain;
pub mod events;
pub mod ports;
