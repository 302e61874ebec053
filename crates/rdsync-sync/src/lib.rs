//! rdsync Sync - account-to-account replication
//!
//! Provides:
//! - One-shot replication passes between two accounts
//! - Interval and cron triggers
//! - A scheduler that fires jobs without overlapping runs
//! - A job manager owning the job lifecycle from registration to shutdown
//!
//! ## Modules
//!
//! - [`engine`] - Sync pass: diff inventories, add what the destination lacks
//! - [`job`] - The [`SyncJob`](job::SyncJob) seam between scheduler and engine
//! - [`trigger`] - When jobs fire
//! - [`scheduler`] - Per-job firing loops with coalescing
//! - [`manager`] - Registration, start and bounded shutdown

pub mod engine;
pub mod job;
pub mod manager;
pub mod scheduler;
pub mod trigger;

use thiserror::Error;

/// Errors that can occur while scheduling or running sync jobs
#[derive(Debug, Error)]
pub enum SyncError {
    /// The job references something the configuration does not define
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The schedule could not be turned into a trigger
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Listing either account failed; the pass was aborted
    #[error("Synchronization failed for job {job}: {cause:#}")]
    Synchronization { job: String, cause: anyhow::Error },

    /// The engine was closed and accepts no further passes
    #[error("Sync engine for job {0} is closed")]
    Closed(String),
}
