use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::job::{Attempt, DispatchError, Job, JobUpdate, SchedulerError};

/// Snapshot and persistence collaborator for one job family.
#[async_trait]
pub trait PendingSource<P>: Send + Sync {
    /// All jobs currently eligible for an attempt: inside the retry budget
    /// and with a due (or absent) schedule, as of `now`.
    async fn pending(
        &self,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job<P>>, SchedulerError>;

    /// Persist the outcome of one attempt.
    async fn apply(&self, job: &Job<P>, update: &JobUpdate) -> Result<(), SchedulerError>;
}

/// Performs a single delivery attempt for one job.
#[async_trait]
pub trait Dispatcher<P>: Send + Sync {
    async fn attempt(&self, job: &Job<P>) -> Result<Attempt, DispatchError>;
}

/// Scheduler tuning knobs, configuration-driven.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick cadence.
    pub interval: Duration,
    /// Retry budget; a job with `retry_count >= max_retries` is never
    /// selected again.
    pub max_retries: u32,
    /// Status applied on successful attempts (unless the dispatcher
    /// overrides it).
    pub success_status: String,
    /// Status applied on failed attempts.
    pub failure_status: String,
    /// Maximum concurrent attempts within one tick.
    pub fan_out: usize,
    /// Spacing between successive retries of the same job.
    pub backoff: Backoff,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_retries: 5,
            success_status: "sent".to_owned(),
            failure_status: "errored".to_owned(),
            fan_out: 8,
            backoff: Backoff::default(),
        }
    }
}

/// Periodically drives pending jobs to a terminal status.
///
/// Each tick takes a snapshot from the [`PendingSource`], dispatches every
/// job through the [`Dispatcher`] with bounded concurrency, and persists the
/// attempt bookkeeping. A job appears at most once per snapshot, so attempts
/// for the same job are never concurrent.
pub struct Scheduler<P> {
    config: SchedulerConfig,
    source: Arc<dyn PendingSource<P>>,
    dispatcher: Arc<dyn Dispatcher<P>>,
    clock: Arc<dyn Clock>,
}

impl<P: Send + Sync> Scheduler<P> {
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn PendingSource<P>>,
        dispatcher: Arc<dyn Dispatcher<P>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            source,
            dispatcher,
            clock,
        }
    }

    /// Run the tick loop until `shutdown` is cancelled.
    ///
    /// Cancellation stops the ticker; in-flight attempts of the current tick
    /// are drained before the loop returns.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.interval.as_secs(),
            max_retries = self.config.max_retries,
            "retry scheduler started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("retry scheduler stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Execute a single scan-and-dispatch pass.
    pub async fn run_once(&self) {
        let now = self.clock.now();
        let jobs = match self.source.pending(self.config.max_retries, now).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "pending scan failed; skipping tick");
                return;
            }
        };
        if jobs.is_empty() {
            return;
        }

        // Space retries of the same job geometrically instead of re-running
        // them on every tick.
        let due: Vec<Job<P>> = jobs
            .into_iter()
            .filter(|job| self.is_due(job, now))
            .collect();

        debug!(jobs = due.len(), "dispatching snapshot");
        futures::stream::iter(due)
            .for_each_concurrent(self.config.fan_out, |job| async move {
                self.attempt_job(job).await;
            })
            .await;
    }

    fn is_due(&self, job: &Job<P>, now: DateTime<Utc>) -> bool {
        match (job.retry_count, job.last_attempted_at) {
            // First attempt of a scheduled or freshly queued job.
            (0, None) => true,
            (attempt, Some(last)) => {
                match chrono::Duration::from_std(self.config.backoff.delay_for(attempt)) {
                    Ok(delay) => last + delay <= now,
                    // A delay beyond chrono's range cannot come due.
                    Err(_) => false,
                }
            }
            // An attempted job always carries a timestamp; treat a missing
            // one as due rather than stranding the row.
            (_, None) => true,
        }
    }

    async fn attempt_job(&self, job: Job<P>) {
        let attempted_at = self.clock.now();
        let (status, provider_message_id) = match self.dispatcher.attempt(&job).await {
            Ok(attempt) => (
                attempt
                    .status
                    .unwrap_or_else(|| self.config.success_status.clone()),
                attempt.provider_message_id,
            ),
            Err(DispatchError(reason)) => {
                warn!(job = %job.id, error = %reason, "dispatch attempt failed");
                (self.config.failure_status.clone(), None)
            }
        };

        let update = JobUpdate {
            status,
            provider_message_id,
            // Every scheduler attempt is a retry, including the first one
            // after an initial failed send.
            retry_count: job.retry_count + 1,
            last_attempted_at: attempted_at,
        };

        if let Err(e) = self.source.apply(&job, &update).await {
            warn!(job = %job.id, error = %e, "failed to persist attempt outcome");
        }
    }
}
