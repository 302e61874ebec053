//! Job manager - owns every sync job from registration to shutdown
//!
//! ## Lifecycle
//!
//! ```text
//! new ──→ start ──→ (jobs firing) ──→ stop(timeout) ──→ wait_for_shutdown returns
//! ```
//!
//! `start` registers each configured job and activates the scheduler.
//! `stop` halts firings, closes every job concurrently with a bounded wait,
//! then signals shutdown-complete.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rdsync_api::client::RealDebridClient;
use rdsync_api::provider::RealDebridProvider;
use rdsync_core::config::{AccountConfig, ApiConfig, Config, JobConfig};
use rdsync_core::events;
use rdsync_core::ports::ITorrentProvider;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::SyncEngine;
use crate::job::SyncJob;
use crate::scheduler::JobScheduler;
use crate::trigger::{self, Trigger};
use crate::SyncError;

// ============================================================================
// Provider factory
// ============================================================================

/// Builds the provider a job uses to talk to one account
///
/// Called once per account reference, so jobs never share clients or
/// rate limiters.
pub trait ProviderFactory: Send + Sync {
    /// Creates a provider for `account`
    fn create(
        &self,
        account_name: &str,
        account: &AccountConfig,
        api: &ApiConfig,
    ) -> anyhow::Result<Arc<dyn ITorrentProvider>>;
}

/// Creates [`RealDebridProvider`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct RealDebridFactory;

impl ProviderFactory for RealDebridFactory {
    fn create(
        &self,
        _account_name: &str,
        account: &AccountConfig,
        api: &ApiConfig,
    ) -> anyhow::Result<Arc<dyn ITorrentProvider>> {
        let client = RealDebridClient::new(account.token.clone(), api)?;
        let provider: Arc<dyn ITorrentProvider> = Arc::new(RealDebridProvider::new(client));
        Ok(provider)
    }
}

// ============================================================================
// JobManager
// ============================================================================

/// Registers, schedules and shuts down sync jobs
pub struct JobManager {
    config: Config,
    factory: Box<dyn ProviderFactory>,
    /// Active jobs by name
    jobs: Mutex<BTreeMap<String, Arc<dyn SyncJob>>>,
    scheduler: JobScheduler,
    /// Cancelled once `stop` has finished
    stopped: CancellationToken,
}

impl JobManager {
    /// Creates a manager for the jobs in `config`
    ///
    /// Nothing is registered or scheduled until [`start`](Self::start).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factory: Box::new(RealDebridFactory),
            jobs: Mutex::new(BTreeMap::new()),
            scheduler: JobScheduler::new(),
            stopped: CancellationToken::new(),
        }
    }

    /// Replaces the provider factory
    pub fn with_provider_factory(mut self, factory: impl ProviderFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Replaces the scheduler; must be called before [`start`](Self::start)
    pub fn with_scheduler(mut self, scheduler: JobScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Returns the configuration the manager was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Names of the active jobs
    pub async fn job_names(&self) -> Vec<String> {
        self.jobs.lock().await.keys().cloned().collect()
    }

    /// Returns whether [`stop`](Self::stop) has completed
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Registers one configured job
    ///
    /// # Returns
    /// `Ok(true)` if the job was scheduled, `Ok(false)` if it is disabled
    ///
    /// # Errors
    /// [`SyncError::Configuration`] if an account is missing or a provider
    /// cannot be built, [`SyncError::InvalidSchedule`] for a bad schedule.
    /// The error is logged before it is returned.
    pub async fn register(&self, name: &str, job: &JobConfig) -> Result<bool, SyncError> {
        if !job.enabled {
            info!(event = events::JOB_SKIPPED, job = name, "Job is disabled, skipping");
            return Ok(false);
        }

        let result = self.build_job(name, job);
        let (trigger, engine) = match result {
            Ok(parts) => parts,
            Err(err) => {
                error!(
                    event = events::JOB_FAILED,
                    job = name,
                    error = %err,
                    "Failed to register job"
                );
                return Err(err);
            }
        };

        self.add_job(name, trigger, engine).await?;
        info!(
            event = events::JOB_ADDED,
            job = name,
            source = %job.source,
            destination = %job.destination,
            schedule_type = job.schedule.kind(),
            schedule_value = %job.schedule.value(),
            dry_run = job.dry_run,
            "Job added"
        );
        Ok(true)
    }

    fn build_job(
        &self,
        name: &str,
        job: &JobConfig,
    ) -> Result<(Arc<dyn Trigger>, Arc<dyn SyncJob>), SyncError> {
        let source = self.provider(name, "source", &job.source)?;
        let destination = self.provider(name, "destination", &job.destination)?;
        let trigger: Arc<dyn Trigger> = Arc::from(trigger::from_schedule(&job.schedule)?);
        let engine: Arc<dyn SyncJob> =
            Arc::new(SyncEngine::new(name, source, destination, job.dry_run));
        Ok((trigger, engine))
    }

    fn provider(
        &self,
        job: &str,
        role: &str,
        account_name: &str,
    ) -> Result<Arc<dyn ITorrentProvider>, SyncError> {
        let account = self.config.accounts.get(account_name).ok_or_else(|| {
            SyncError::Configuration(format!(
                "{role} account '{account_name}' referenced by job '{job}' is not defined"
            ))
        })?;
        self.factory
            .create(account_name, account, &self.config.api)
            .map_err(|e| {
                SyncError::Configuration(format!(
                    "failed to create client for account '{account_name}': {e:#}"
                ))
            })
    }

    /// Adds a prebuilt job under `name` and schedules it
    ///
    /// # Errors
    /// [`SyncError::Configuration`] if a job with that name is already active
    pub async fn add_job(
        &self,
        name: &str,
        trigger: Arc<dyn Trigger>,
        job: Arc<dyn SyncJob>,
    ) -> Result<(), SyncError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(name) {
            return Err(SyncError::Configuration(format!(
                "job '{name}' is already registered"
            )));
        }
        jobs.insert(name.to_string(), Arc::clone(&job));
        self.scheduler.add(name, trigger, job);
        Ok(())
    }

    /// Registers every configured job, then activates the scheduler
    ///
    /// A job that fails to register is logged and left out; the others
    /// still start.
    pub async fn start(&self) {
        info!(
            event = events::SCHEDULER_STARTING,
            jobs = self.config.syncs.len(),
            "Starting scheduler"
        );

        for (name, job) in &self.config.syncs {
            // Already logged by register
            let _ = self.register(name, job).await;
        }

        self.scheduler.start();
        let active = self.jobs.lock().await.len();
        info!(
            event = events::SCHEDULER_STARTED,
            active_jobs = active,
            "Scheduler started"
        );
    }

    /// Shuts down every job
    ///
    /// Halts new firings, drops pending ones, then closes all jobs
    /// concurrently. A job still closing after `timeout` is abandoned and
    /// logged. Calling `stop` again after it completed has no effect.
    pub async fn stop(&self, timeout: Duration) {
        if self.is_stopped() {
            return;
        }
        info!(
            event = events::SCHEDULER_STOPPING,
            timeout_secs = timeout.as_secs(),
            "Stopping scheduler"
        );

        self.scheduler.pause();
        self.scheduler.remove_all();
        self.scheduler.shutdown();

        let jobs: Vec<(String, Arc<dyn SyncJob>)> = self
            .jobs
            .lock()
            .await
            .iter()
            .map(|(name, job)| (name.clone(), Arc::clone(job)))
            .collect();

        join_all(jobs.into_iter().map(|(name, job)| async move {
            match tokio::time::timeout(timeout, job.close()).await {
                Ok(()) => info!(event = events::JOB_CLOSED, job = %name, "Job closed"),
                Err(_) => warn!(
                    event = events::JOB_FAILED,
                    job = %name,
                    timeout_secs = timeout.as_secs(),
                    "Job did not close in time, abandoning"
                ),
            }
        }))
        .await;

        self.jobs.lock().await.clear();
        self.stopped.cancel();
        info!(event = events::SCHEDULER_STOPPED, "Scheduler stopped");
    }

    /// Waits until [`stop`](Self::stop) has completed
    pub async fn wait_for_shutdown(&self) {
        self.stopped.cancelled().await;
    }
}
