//! Structured event names
//!
//! Every observable step is logged as a `tracing` event with an `event` field
//! set to one of these names, so log consumers can filter on a stable key
//! instead of parsing messages.

// Application
pub const APP_STARTING: &str = "app.starting";
pub const SHUTDOWN_INITIATED: &str = "shutdown.initiated";
pub const SHUTDOWN_COMPLETE: &str = "shutdown.complete";

// Scheduler
pub const SCHEDULER_STARTING: &str = "scheduler.starting";
pub const SCHEDULER_STARTED: &str = "scheduler.started";
pub const SCHEDULER_STOPPING: &str = "scheduler.stopping";
pub const SCHEDULER_STOPPED: &str = "scheduler.stopped";

// Jobs
pub const JOB_ADDED: &str = "job.added";
pub const JOB_SKIPPED: &str = "job.skipped";
pub const JOB_CLOSED: &str = "job.closed";
pub const JOB_FAILED: &str = "job.failed";
pub const JOB_COALESCED: &str = "job.coalesced";

// Sync passes
pub const SYNC_STARTED: &str = "sync.started";
pub const SYNC_ANALYSIS: &str = "sync.analysis";
pub const SYNC_COMPLETE: &str = "sync.complete";
pub const SYNC_FAILED: &str = "sync.failed";
pub const TRANSFER_STARTED: &str = "transfer.started";

// Torrents
pub const TORRENT_FETCHING: &str = "torrent.fetching";
pub const TORRENT_ADDED: &str = "torrent.added";
pub const TORRENT_FAILED: &str = "torrent.failed";
