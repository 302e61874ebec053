//! Job scheduler - fires jobs according to their triggers
//!
//! Each scheduled job gets its own firing loop. The loop sleeps until the
//! trigger's next fire time, then starts a run on a separate task so a slow
//! run never delays the schedule.
//!
//! ## Coalescing
//!
//! At most one run per job is in flight. A firing that comes due while the
//! previous run is still going is skipped, not queued.
//!
//! ```text
//! trigger ──→ firing loop ──→ in-flight? ──yes──→ skip (job.coalesced)
//!                                 │
//!                                 no
//!                                 ↓
//!                          spawn SyncJob::run
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rdsync_core::events;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::SyncOutcome;
use crate::job::SyncJob;
use crate::trigger::Trigger;
use crate::SyncError;

/// Source of the current time for trigger evaluation
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall-clock time
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Wall-clock time as of creation, advanced by tokio's clock
///
/// Follows `tokio::time::pause` and `advance`, so trigger arithmetic
/// agrees with `tokio::time::sleep` in tests that pause time.
pub fn tokio_clock() -> Clock {
    let base = Utc::now();
    let start = tokio::time::Instant::now();
    Arc::new(move || {
        let elapsed = chrono::Duration::from_std(start.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        base + elapsed
    })
}

/// A job registered with the scheduler
struct ScheduledJob {
    name: String,
    trigger: Arc<dyn Trigger>,
    job: Arc<dyn SyncJob>,
    /// Cancels this job's firing loop; `None` until the loop is spawned
    cancel: Option<CancellationToken>,
}

#[derive(Default)]
struct SchedulerState {
    jobs: Vec<ScheduledJob>,
    started: bool,
}

/// Clears the in-flight flag when a run ends, even if it panicked
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fires registered jobs according to their triggers
///
/// Must be used from within a tokio runtime: [`start`](Self::start) and
/// [`add`](Self::add) on a started scheduler spawn tasks.
pub struct JobScheduler {
    state: Mutex<SchedulerState>,
    /// Cleared by [`pause`](Self::pause); firings are skipped while false
    accepting: Arc<AtomicBool>,
    /// Parent of every firing loop's token
    shutdown: CancellationToken,
    clock: Clock,
}

impl JobScheduler {
    /// Creates a stopped scheduler with no jobs
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Creates a scheduler that reads the current time from `clock`
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            state: Mutex::new(SchedulerState::default()),
            accepting: Arc::new(AtomicBool::new(true)),
            shutdown: CancellationToken::new(),
            clock,
        }
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a job
    ///
    /// If the scheduler is already running, the job's firing loop starts
    /// right away.
    ///
    /// # Arguments
    /// * `name` - Job name, for logging
    /// * `trigger` - When the job fires
    /// * `job` - What runs on each firing
    pub fn add(&self, name: impl Into<String>, trigger: Arc<dyn Trigger>, job: Arc<dyn SyncJob>) {
        let mut entry = ScheduledJob {
            name: name.into(),
            trigger,
            job,
            cancel: None,
        };

        let mut state = self.state();
        if state.started {
            self.spawn_loop(&mut entry);
        }
        debug!(job = %entry.name, trigger = %entry.trigger.describe(), "Job scheduled");
        state.jobs.push(entry);
    }

    /// Starts the firing loops of all registered jobs
    ///
    /// Calling `start` on a running or shut down scheduler has no effect.
    pub fn start(&self) {
        if self.shutdown.is_cancelled() {
            warn!("Scheduler has been shut down and cannot be restarted");
            return;
        }

        let mut state = self.state();
        if state.started {
            return;
        }
        state.started = true;
        self.accepting.store(true, Ordering::Release);

        for entry in state.jobs.iter_mut() {
            self.spawn_loop(entry);
        }
        debug!(jobs = state.jobs.len(), "Scheduler started");
    }

    /// Stops accepting firings; loops keep running but skip every firing
    pub fn pause(&self) {
        self.accepting.store(false, Ordering::Release);
        debug!("Scheduler paused");
    }

    /// Resumes accepting firings after [`pause`](Self::pause)
    pub fn resume(&self) {
        self.accepting.store(true, Ordering::Release);
        debug!("Scheduler resumed");
    }

    /// Returns whether firings are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    /// Removes every job and cancels its pending firings
    ///
    /// Runs already in flight are not interrupted.
    pub fn remove_all(&self) {
        let jobs = std::mem::take(&mut self.state().jobs);
        for entry in &jobs {
            if let Some(cancel) = &entry.cancel {
                cancel.cancel();
            }
        }
        debug!(removed = jobs.len(), "Removed all scheduled jobs");
    }

    /// Stops the scheduler for good
    ///
    /// Cancels every firing loop. In-flight runs finish on their own.
    pub fn shutdown(&self) {
        self.pause();
        self.shutdown.cancel();
        let mut state = self.state();
        state.started = false;
        state.jobs.clear();
        debug!("Scheduler shut down");
    }

    /// Names of the scheduled jobs, in registration order
    pub fn job_names(&self) -> Vec<String> {
        self.state().jobs.iter().map(|j| j.name.clone()).collect()
    }

    fn spawn_loop(&self, entry: &mut ScheduledJob) {
        let cancel = self.shutdown.child_token();
        entry.cancel = Some(cancel.clone());

        tokio::spawn(firing_loop(
            entry.name.clone(),
            Arc::clone(&entry.trigger),
            Arc::clone(&entry.job),
            Arc::clone(&self.accepting),
            Arc::clone(&self.clock),
            cancel,
        ));
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleeps until each fire time and launches a run unless one is in flight
async fn firing_loop(
    name: String,
    trigger: Arc<dyn Trigger>,
    job: Arc<dyn SyncJob>,
    accepting: Arc<AtomicBool>,
    clock: Clock,
    cancel: CancellationToken,
) {
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut previous = None;

    loop {
        let now = clock();
        let Some(next) = trigger.next_fire(previous, now) else {
            debug!(job = %name, "Trigger exhausted");
            break;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        previous = Some(next);

        if !accepting.load(Ordering::Acquire) {
            debug!(job = %name, "Scheduler paused, skipping firing");
            continue;
        }

        if in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(
                event = events::JOB_COALESCED,
                job = %name,
                "Previous run still in progress, skipping firing"
            );
            continue;
        }

        let guard = InFlightGuard(Arc::clone(&in_flight));
        let job = Arc::clone(&job);
        let name = name.clone();
        tokio::spawn(async move {
            let _guard = guard;
            log_run_end(&name, job.run().await);
        });
    }

    info!(job = %name, "Firing loop stopped");
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunEnd {
    Finished,
    /// The job was closed before the run could start, e.g. during shutdown
    Closed,
    Failed,
}

fn log_run_end(name: &str, result: Result<SyncOutcome, SyncError>) -> RunEnd {
    match result {
        Ok(outcome) => {
            debug!(
                job = %name,
                attempted = outcome.attempted,
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "Run finished"
            );
            RunEnd::Finished
        }
        Err(SyncError::Closed(_)) => {
            debug!(job = %name, "Job closed before the run started");
            RunEnd::Closed
        }
        Err(err) => {
            warn!(
                event = events::JOB_FAILED,
                job = %name,
                error = %err,
                "Run failed"
            );
            RunEnd::Failed
        }
    }
}
