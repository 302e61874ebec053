//! Schedulable job abstraction
//!
//! The scheduler and the manager only see [`SyncJob`]; [`SyncEngine`] is the
//! production implementation.
//!
//! [`SyncEngine`]: crate::engine::SyncEngine

use crate::engine::SyncOutcome;
use crate::SyncError;

/// A unit of work the scheduler can fire repeatedly
#[async_trait::async_trait]
pub trait SyncJob: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Runs one pass
    async fn run(&self) -> Result<SyncOutcome, SyncError>;

    /// Releases the job's resources
    ///
    /// Waits for an in-flight pass to finish. After closing, [`run`](Self::run)
    /// must fail with [`SyncError::Closed`].
    async fn close(&self);
}
