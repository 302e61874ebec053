//! Inventories and transfer plans
//!
//! An [`Inventory`] is the set of torrents known on one account, keyed by
//! content hash. A [`TransferPlan`] is the set of hashes present in a source
//! inventory and absent from a destination inventory.

use std::collections::{HashMap, HashSet};

use super::torrent::Torrent;

// ============================================================================
// Inventory
// ============================================================================

/// All torrents of one account, keyed by content hash
///
/// Built fresh for every sync pass. Hashes are unique: when the remote listing
/// reports the same hash more than once, the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    by_hash: HashMap<String, Torrent>,
}

impl Inventory {
    /// Creates an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a torrent unless its hash is already present.
    ///
    /// Returns `false` when the hash was a duplicate.
    pub fn insert(&mut self, torrent: Torrent) -> bool {
        if self.by_hash.contains_key(&torrent.hash) {
            return false;
        }
        self.by_hash.insert(torrent.hash.clone(), torrent);
        true
    }

    /// Looks up a torrent by content hash
    pub fn get(&self, hash: &str) -> Option<&Torrent> {
        self.by_hash.get(hash)
    }

    /// Returns whether a torrent with this hash is present
    pub fn contains(&self, hash: &str) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Number of distinct torrents
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Returns whether the account has no torrents
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// Content hashes, in unspecified order
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.by_hash.keys().map(String::as_str)
    }

    /// Torrents, in unspecified order
    pub fn torrents(&self) -> impl Iterator<Item = &Torrent> {
        self.by_hash.values()
    }
}

impl FromIterator<Torrent> for Inventory {
    fn from_iter<I: IntoIterator<Item = Torrent>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for torrent in iter {
            inventory.insert(torrent);
        }
        inventory
    }
}

impl Extend<Torrent> for Inventory {
    fn extend<I: IntoIterator<Item = Torrent>>(&mut self, iter: I) {
        for torrent in iter {
            self.insert(torrent);
        }
    }
}

// ============================================================================
// TransferPlan
// ============================================================================

/// Content hashes that must be replicated from source to destination
///
/// Always a subset of the source hashes and disjoint from the destination
/// hashes. Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPlan {
    hashes: HashSet<String>,
}

impl TransferPlan {
    /// Computes `keys(source) - keys(destination)`
    pub fn between(source: &Inventory, destination: &Inventory) -> Self {
        let hashes = source
            .hashes()
            .filter(|hash| !destination.contains(hash))
            .map(str::to_string)
            .collect();
        Self { hashes }
    }

    /// Number of torrents to transfer
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns whether the destination already has everything
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Returns whether `hash` is scheduled for transfer
    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Planned hashes, in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hashes.iter().map(String::as_str)
    }
}
