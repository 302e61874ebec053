//! One-shot replication between two accounts
//!
//! The [`SyncEngine`] adds to a destination account every torrent the source
//! account has and the destination lacks, matching torrents by info-hash.
//!
//! ## Pass Flow
//!
//! 1. **Inventory**: list both accounts concurrently; a failure aborts the pass
//! 2. **Plan**: source hashes minus destination hashes
//! 3. **Transfer**: for each planned hash, fetch the source details and add the
//!    torrent to the destination with the same file selection
//! 4. **Summary**: aggregate counts and success rate
//!
//! Failures in step 3 are isolated per torrent: they are logged and counted,
//! and the remaining torrents are still processed. The source is never
//! modified and the destination is only ever extended.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use rdsync_core::domain::{format_size, Inventory, TransferPlan};
use rdsync_core::events;
use rdsync_core::ports::ITorrentProvider;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::job::SyncJob;
use crate::SyncError;

// ============================================================================
// SyncOutcome
// ============================================================================

/// A torrent that could not be transferred
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Info-hash of the torrent
    pub hash: String,
    /// Rendered error chain
    pub error: String,
}

/// Summary of a completed sync pass
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Job the pass belongs to
    pub job: String,
    /// Whether adds were skipped
    pub dry_run: bool,
    /// Torrents on the source account
    pub source_count: usize,
    /// Torrents on the destination account before the pass
    pub destination_count: usize,
    /// Torrents the destination lacked
    pub plan_size: usize,
    /// Torrents processed
    pub attempted: usize,
    /// Torrents added (or that would have been, in dry-run mode)
    pub succeeded: usize,
    /// Torrents that failed
    pub failed: usize,
    /// Details of each failure
    pub failures: Vec<TransferFailure>,
    /// Wall-clock duration of the pass in milliseconds
    pub duration_ms: u64,
}

impl SyncOutcome {
    /// Percentage of attempted torrents that succeeded; 100 when nothing was attempted
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            100.0
        } else {
            self.succeeded as f64 / self.attempted as f64 * 100.0
        }
    }
}

/// What a single successful transfer touched
#[derive(Debug)]
struct TransferDetails {
    name: String,
    bytes: u64,
    files_selected: usize,
    files_total: usize,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Replicates torrents from a source account to a destination account
///
/// ## Dependencies
///
/// - `source`: account torrents are read from
/// - `destination`: account torrents are added to
///
/// Passes are serialized by an internal lock; [`close`](SyncJob::close) takes
/// the same lock, so it waits for an in-flight pass before marking the engine
/// closed.
pub struct SyncEngine {
    /// Job name, used in every log event
    job_name: String,
    source: Arc<dyn ITorrentProvider>,
    destination: Arc<dyn ITorrentProvider>,
    /// When set, plans and inspects but never adds
    dry_run: bool,
    /// Held for the duration of a pass
    pass_lock: Mutex<()>,
    closed: AtomicBool,
}

impl SyncEngine {
    /// Creates a new `SyncEngine`
    ///
    /// # Arguments
    /// * `job_name` - Name of the job, for logging
    /// * `source` - Account to replicate from
    /// * `destination` - Account to replicate to
    /// * `dry_run` - Skip the add calls
    pub fn new(
        job_name: impl Into<String>,
        source: Arc<dyn ITorrentProvider>,
        destination: Arc<dyn ITorrentProvider>,
        dry_run: bool,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            source,
            destination,
            dry_run,
            pass_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns whether the engine is in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns whether the engine has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Performs one replication pass
    ///
    /// # Returns
    /// A [`SyncOutcome`] with the aggregate counts. Per-torrent failures are
    /// reported in the outcome, never as an error.
    ///
    /// # Errors
    /// [`SyncError::Synchronization`] if either listing fails,
    /// [`SyncError::Closed`] if the engine was closed.
    pub async fn sync(&self) -> Result<SyncOutcome, SyncError> {
        if self.is_closed() {
            return Err(SyncError::Closed(self.job_name.clone()));
        }
        let _pass = self.pass_lock.lock().await;
        if self.is_closed() {
            return Err(SyncError::Closed(self.job_name.clone()));
        }

        let start = Instant::now();
        let job = self.job_name.as_str();
        info!(
            event = events::SYNC_STARTED,
            job,
            dry_run = self.dry_run,
            "Starting sync"
        );

        // Step 1: Inventories
        info!(
            event = events::TORRENT_FETCHING,
            job, "Fetching torrents from source and destination"
        );
        let (source_inventory, destination_inventory) =
            match tokio::try_join!(
                async { self.source.list_all().await.context("Failed to list source account") },
                async {
                    self.destination
                        .list_all()
                        .await
                        .context("Failed to list destination account")
                },
            ) {
                Ok(inventories) => inventories,
                Err(cause) => {
                    error!(
                        event = events::SYNC_FAILED,
                        job,
                        error = %format!("{cause:#}"),
                        "Synchronization failed"
                    );
                    return Err(SyncError::Synchronization {
                        job: self.job_name.clone(),
                        cause,
                    });
                }
            };

        // Step 2: Plan
        let plan = TransferPlan::between(&source_inventory, &destination_inventory);
        info!(
            event = events::SYNC_ANALYSIS,
            job,
            source_count = source_inventory.len(),
            dest_count = destination_inventory.len(),
            sync_count = plan.len(),
            "Analyzed inventories"
        );

        let mut outcome = SyncOutcome {
            job: self.job_name.clone(),
            dry_run: self.dry_run,
            source_count: source_inventory.len(),
            destination_count: destination_inventory.len(),
            plan_size: plan.len(),
            ..SyncOutcome::default()
        };

        if plan.is_empty() {
            outcome.duration_ms = start.elapsed().as_millis() as u64;
            info!(
                event = events::SYNC_COMPLETE,
                job,
                success_count = 0,
                error_count = 0,
                total = 0,
                "All torrents are in sync"
            );
            return Ok(outcome);
        }

        // Step 3: Transfers
        let total = plan.len();
        info!(
            event = events::TRANSFER_STARTED,
            job,
            count = total,
            dry_run = self.dry_run,
            "Transferring torrents"
        );

        for (index, hash) in plan.iter().enumerate() {
            let current = index + 1;
            outcome.attempted += 1;

            match self.transfer(&source_inventory, hash).await {
                Ok(details) => {
                    outcome.succeeded += 1;
                    info!(
                        event = events::TORRENT_ADDED,
                        job,
                        name = %details.name,
                        progress = %format!("{:.1}%", current as f64 / total as f64 * 100.0),
                        current,
                        total,
                        files = %format!("{}/{}", details.files_selected, details.files_total),
                        size = %format_size(details.bytes),
                        hash,
                        dry_run = self.dry_run,
                        "Torrent added"
                    );
                }
                Err(err) => {
                    outcome.failed += 1;
                    let rendered = format!("{err:#}");
                    let name = source_inventory
                        .get(hash)
                        .map(|t| t.filename.as_str())
                        .unwrap_or_default();
                    error!(
                        event = events::TORRENT_FAILED,
                        job,
                        name,
                        error = %rendered,
                        hash,
                        "Failed to transfer torrent"
                    );
                    outcome.failures.push(TransferFailure {
                        hash: hash.to_string(),
                        error: rendered,
                    });
                }
            }
        }

        // Step 4: Summary
        outcome.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            event = events::SYNC_COMPLETE,
            job,
            success_count = outcome.succeeded,
            error_count = outcome.failed,
            total = outcome.attempted,
            success_rate = %format!("{:.1}%", outcome.success_rate()),
            duration_ms = outcome.duration_ms,
            "Sync complete"
        );

        Ok(outcome)
    }

    /// Copies one torrent to the destination
    async fn transfer(&self, source_inventory: &Inventory, hash: &str) -> Result<TransferDetails> {
        let torrent = source_inventory
            .get(hash)
            .with_context(|| format!("Torrent {hash} is not in the source inventory"))?;

        let info = self
            .source
            .get_torrent_info(&torrent.id)
            .await
            .with_context(|| format!("Failed to fetch details for torrent {}", torrent.id))?;
        let selected = info.selected_file_ids();

        if self.dry_run {
            debug!(job = %self.job_name, hash, "Dry run, skipping add");
        } else {
            self.destination
                .add_by_hash(hash, Some(&selected))
                .await
                .with_context(|| format!("Failed to add torrent {hash} to destination"))?;
        }

        Ok(TransferDetails {
            name: info.filename,
            bytes: info.bytes,
            files_selected: selected.len(),
            files_total: info.files.len(),
        })
    }
}

#[async_trait::async_trait]
impl SyncJob for SyncEngine {
    fn name(&self) -> &str {
        &self.job_name
    }

    async fn run(&self) -> Result<SyncOutcome, SyncError> {
        self.sync().await
    }

    async fn close(&self) {
        let _pass = self.pass_lock.lock().await;
        self.closed.store(true, Ordering::Release);
        debug!(job = %self.job_name, "Sync engine closed");
    }
}
