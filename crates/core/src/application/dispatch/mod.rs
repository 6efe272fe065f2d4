// Dispatch Queue - admission, control and observation of the outbound queue

mod dispatcher;
pub mod enqueue;

#[cfg(test)]
mod enqueue_test;

pub use enqueue::{validate_request, EnqueueRequest};

use crate::application::rate_limiter::RateLimiter;
use crate::application::retry::RetryPolicy;
use crate::application::scheduler::JobStore;
use crate::application::stats::{FinishedJobs, QueueStats, QueueStatus, StatsCounters};
use crate::domain::{JobId, JobSnapshot, MessageJob, QueueConfig};
use crate::error::{AppError, Result};
use crate::port::{
    DeliveryLog, IdProvider, NullDeliveryLog, SystemTimeProvider, TimeProvider, Transport,
    UuidProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};

/// Handle to one outbound dispatch queue
///
/// Cheap to clone; every clone talks to the same store and drain loop.
/// Construct once at startup and pass it to every producer.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    delivery_log: Arc<dyn DeliveryLog>,
    retry_policy: RetryPolicy,
    rate_limiter: RateLimiter,
    config: QueueConfig,
    state: Mutex<QueueState>,
    /// `true` while no drain loop is running
    idle_tx: watch::Sender<bool>,
}

struct QueueState {
    store: JobStore,
    /// The single job inside a Transport call, outside the store
    in_flight: Option<MessageJob>,
    counters: StatsCounters,
    history: FinishedJobs,
    paused: bool,
    /// A drain loop task exists
    active: bool,
    /// Pacing anchor: when the previous job finished processing
    last_completed: Option<Instant>,
}

impl DispatchQueue {
    /// Create a new queue with all dependencies injected
    ///
    /// # Errors
    /// AppError::Domain if the configuration is invalid
    pub fn new(
        config: QueueConfig,
        transport: Arc<dyn Transport>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        delivery_log: Arc<dyn DeliveryLog>,
    ) -> Result<Self> {
        config.validate()?;
        let rate_limiter = RateLimiter::new(config.messages_per_minute)?;
        let retry_policy = RetryPolicy::new(config.requeue_placement);
        let (idle_tx, _) = watch::channel(true);

        info!(
            messages_per_minute = config.messages_per_minute,
            delay_ms = rate_limiter.delay_ms(),
            max_attempts = config.default_max_attempts,
            requeue = ?config.requeue_placement,
            start_paused = config.start_paused,
            "Dispatch queue created"
        );

        let state = QueueState {
            store: JobStore::new(),
            in_flight: None,
            counters: StatsCounters::default(),
            history: FinishedJobs::new(config.history_limit),
            paused: config.start_paused,
            active: false,
            last_completed: None,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                id_provider,
                time_provider,
                delivery_log,
                retry_policy,
                rate_limiter,
                config,
                state: Mutex::new(state),
                idle_tx,
            }),
        })
    }

    /// Queue with UUID ids, system clock and no delivery log
    pub fn with_defaults(config: QueueConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::new(
            config,
            transport,
            Arc::new(UuidProvider),
            Arc::new(SystemTimeProvider),
            Arc::new(NullDeliveryLog),
        )
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Fixed pause between two processed jobs
    pub fn delay(&self) -> Duration {
        self.inner.rate_limiter.delay()
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    /// Admit one job and start the drain loop if it is idle
    ///
    /// Never waits for delivery.
    pub async fn enqueue(&self, req: EnqueueRequest) -> Result<JobId> {
        validate_request(&req)?;

        let mut state = self.inner.state.lock().await;
        let job_id = self.admit(&mut state, req);
        dispatcher::start_if_idle(&self.inner, &mut state);
        Ok(job_id)
    }

    /// Admit jobs in input order, returning their ids
    ///
    /// Every job is validated before any is admitted.
    pub async fn enqueue_bulk(&self, requests: Vec<EnqueueRequest>) -> Result<Vec<JobId>> {
        for (index, req) in requests.iter().enumerate() {
            validate_request(req).map_err(|e| match e {
                AppError::Validation(msg) => AppError::Validation(format!("job {}: {}", index, msg)),
                other => other,
            })?;
        }

        let mut state = self.inner.state.lock().await;
        let job_ids: Vec<JobId> = requests
            .into_iter()
            .map(|req| self.admit(&mut state, req))
            .collect();
        dispatcher::start_if_idle(&self.inner, &mut state);

        info!(count = job_ids.len(), pending = state.store.len(), "Bulk enqueue accepted");
        Ok(job_ids)
    }

    fn admit(&self, state: &mut QueueState, req: EnqueueRequest) -> JobId {
        let job_id = self.inner.id_provider.generate_id();
        let now = self.inner.time_provider.now_millis();
        let job = enqueue::build_job(req, job_id.clone(), now, self.inner.config.default_max_attempts);

        info!(
            job_id = %job_id,
            priority = job.priority,
            max_attempts = job.max_attempts,
            "Job enqueued"
        );

        state.store.admit(job);
        state.counters.total_queued += 1;
        job_id
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    /// Stop taking new jobs; the in-flight send still completes
    pub async fn pause(&self) {
        let mut state = self.inner.state.lock().await;
        if state.paused {
            debug!("Queue already paused");
            return;
        }
        state.paused = true;
        info!(
            pending = state.store.len(),
            in_flight = state.in_flight.is_some(),
            "Queue paused"
        );
    }

    /// Lift a pause and restart the drain loop if jobs are waiting
    pub async fn resume(&self) {
        let mut state = self.inner.state.lock().await;
        let was_paused = state.paused;
        state.paused = false;
        let started = dispatcher::start_if_idle(&self.inner, &mut state);

        if was_paused {
            info!(pending = state.store.len(), restarted = started, "Queue resumed");
        } else {
            debug!(restarted = started, "Resume on a running queue");
        }
    }

    /// Discard every pending job; the in-flight send is not affected
    pub async fn clear(&self) -> usize {
        let mut state = self.inner.state.lock().await;
        let removed = state.store.clear();
        info!(removed, in_flight = state.in_flight.is_some(), "Pending jobs cleared");
        removed
    }

    /// Resolves once no drain loop is running (store empty or paused)
    pub async fn wait_idle(&self) {
        let mut idle_rx = self.inner.idle_tx.subscribe();
        // The sender lives in `inner`, which `self` keeps alive
        let _ = idle_rx.wait_for(|idle| *idle).await;
    }

    /// Resume and wait until the loop stops
    pub async fn drain(&self) {
        self.resume().await;
        self.wait_idle().await;
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub async fn get_stats(&self) -> QueueStats {
        let state = self.inner.state.lock().await;
        let limiter = &self.inner.rate_limiter;
        let queue_length = state.store.len();

        QueueStats {
            total_queued: state.counters.total_queued,
            total_sent: state.counters.total_sent,
            total_failed: state.counters.total_failed,
            total_retried: state.counters.total_retried,
            current_queue_length: queue_length,
            processing: state.active,
            paused: state.paused,
            average_processing_ms: state.counters.average_processing_ms,
            last_processed_at: state.counters.last_processed_at,
            estimated_time_remaining_ms: limiter.estimated_drain_ms(queue_length),
            messages_per_minute: limiter.messages_per_minute(),
            delay_ms: limiter.delay_ms(),
        }
    }

    /// Snapshot of pending jobs in dispatch order
    pub async fn get_queue_status(&self) -> QueueStatus {
        let state = self.inner.state.lock().await;
        QueueStatus {
            queue_length: state.store.len(),
            processing: state.active,
            paused: state.paused,
            in_flight: state.in_flight.as_ref().map(JobSnapshot::from),
            items: state.store.snapshot(),
        }
    }

    /// Look a job up among in-flight, pending and recently finished jobs
    pub async fn get_job(&self, job_id: &JobId) -> Option<JobSnapshot> {
        let state = self.inner.state.lock().await;
        state
            .in_flight
            .as_ref()
            .filter(|job| &job.id == job_id)
            .or_else(|| state.store.find(job_id))
            .or_else(|| state.history.find(job_id))
            .map(JobSnapshot::from)
    }
}
