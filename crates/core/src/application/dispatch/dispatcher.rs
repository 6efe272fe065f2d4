// Dispatcher - the single drain loop
//
// At most one loop task exists per queue: it is spawned only when the queue
// is not paused, no loop is active and the store has work. The state lock is
// never held across the Transport call or the pacing sleep.

use super::{Inner, QueueState};
use crate::application::retry::{FailureReason, RetryDecision};
use crate::domain::MessageJob;
use crate::port::{Delivery, DeliveryRecord, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

/// What the loop does next
enum Step {
    Stop,
    Wait(Duration),
    Dispatch(MessageJob),
    /// Job could not start an attempt; already failed
    Reject(MessageJob),
}

/// Spawn the drain loop unless paused, already running or out of work
///
/// Returns true if a loop was started.
pub(super) fn start_if_idle(inner: &Arc<Inner>, state: &mut QueueState) -> bool {
    if state.paused || state.active || state.store.is_empty() {
        return false;
    }
    state.active = true;
    inner.idle_tx.send_replace(false);

    let inner = Arc::clone(inner);
    tokio::spawn(async move { run(inner).await });
    true
}

async fn run(inner: Arc<Inner>) {
    debug!("Dispatcher started");
    loop {
        let step = {
            let mut state = inner.state.lock().await;
            next_step(&inner, &mut state)
        };

        match step {
            Step::Stop => break,
            Step::Wait(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, "Pacing before next dispatch");
                sleep(delay).await;
            }
            Step::Reject(job) => record_terminal(&inner, &job).await,
            Step::Dispatch(job) => {
                if let Some(finished) = dispatch(&inner, job).await {
                    record_terminal(&inner, &finished).await;
                }
            }
        }
    }
}

fn next_step(inner: &Inner, state: &mut QueueState) -> Step {
    if state.paused || state.store.is_empty() {
        state.active = false;
        inner.idle_tx.send_replace(true);
        info!(
            paused = state.paused,
            pending = state.store.len(),
            "Dispatcher stopped"
        );
        return Step::Stop;
    }

    let wait = inner
        .rate_limiter
        .remaining(state.last_completed, Instant::now());
    if !wait.is_zero() {
        return Step::Wait(wait);
    }

    let Some(mut job) = state.store.pop_head() else {
        return Step::Wait(Duration::ZERO);
    };

    match job.begin_attempt() {
        Ok(()) => {
            state.in_flight = Some(job.clone());
            Step::Dispatch(job)
        }
        Err(e) => {
            error!(job_id = %job.id, error = %e, "Cannot start dispatch attempt");
            job.fail(e.to_string(), true, inner.time_provider.now_millis());
            state.counters.total_failed += 1;
            state.history.push(job.clone());
            Step::Reject(job)
        }
    }
}

/// Run one attempt and settle the outcome; returns the job if it is terminal
async fn dispatch(inner: &Inner, job: MessageJob) -> Option<MessageJob> {
    info!(
        job_id = %job.id,
        attempt = job.attempts,
        max_attempts = job.max_attempts,
        priority = job.priority,
        "Dispatching message"
    );

    let started = Instant::now();
    let result = send_isolated(inner, &job).await;
    let elapsed = started.elapsed();

    let mut state = inner.state.lock().await;
    let now = inner.time_provider.now_millis();
    state.in_flight = None;
    state.last_completed = Some(Instant::now());
    state.counters.record_processing(elapsed, now);

    settle(inner, &mut state, job, result, now)
}

/// Transport call in its own task so a panic fails the job, not the loop
async fn send_isolated(inner: &Inner, job: &MessageJob) -> Result<Delivery, TransportError> {
    let transport = Arc::clone(&inner.transport);
    let destination = job.destination.clone();
    let payload = job.payload.clone();
    let metadata = job.metadata.clone();
    let send_timeout = inner.config.send_timeout;

    let handle = tokio::spawn(async move {
        let send = transport.send(&destination, &payload, &metadata);
        match send_timeout {
            Some(limit) => match timeout(limit, send).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Transient(format!(
                    "send timed out after {}ms",
                    limit.as_millis()
                ))),
            },
            None => send.await,
        }
    });

    match handle.await {
        Ok(result) => result,
        Err(join_err) => {
            // Task panicked or was cancelled (non-retryable)
            if join_err.is_panic() {
                error!(job_id = %job.id, "Transport panicked");
            } else {
                error!(job_id = %job.id, "Transport task cancelled");
            }
            Err(TransportError::Permanent(format!(
                "transport task aborted: {}",
                join_err
            )))
        }
    }
}

fn settle(
    inner: &Inner,
    state: &mut QueueState,
    mut job: MessageJob,
    result: Result<Delivery, TransportError>,
    now: i64,
) -> Option<MessageJob> {
    let error = match result {
        Ok(delivery) => {
            if let Err(e) = job.mark_sent(delivery.message_id, now) {
                error!(job_id = %job.id, error = %e, "Delivered job in unexpected status");
                job.fail(e.to_string(), true, now);
                return Some(finish_failed(state, job));
            }
            state.counters.total_sent += 1;
            info!(job_id = %job.id, attempts = job.attempts, "Message sent");
            state.history.push(job.clone());
            return Some(job);
        }
        Err(error) => error,
    };

    match inner.retry_policy.decide(&job, &error) {
        RetryDecision::Retry(placement) => {
            if let Err(e) = job.mark_retrying(error.message()) {
                error!(job_id = %job.id, error = %e, "Retrying job in unexpected status");
                job.fail(e.to_string(), true, now);
                return Some(finish_failed(state, job));
            }
            state.counters.total_retried += 1;
            state.store.requeue(job, placement);
            None
        }
        RetryDecision::Failed(reason) => {
            let permanent = reason == FailureReason::NonRetryable;
            job.fail(error.message(), permanent, now);
            warn!(
                job_id = %job.id,
                attempts = job.attempts,
                reason = ?reason,
                "Message failed"
            );
            Some(finish_failed(state, job))
        }
    }
}

fn finish_failed(state: &mut QueueState, job: MessageJob) -> MessageJob {
    state.counters.total_failed += 1;
    state.history.push(job.clone());
    job
}

async fn record_terminal(inner: &Inner, job: &MessageJob) {
    let record = DeliveryRecord::from(job);
    if let Err(e) = inner.delivery_log.record(&record).await {
        warn!(job_id = %job.id, error = %e, "Failed to record delivery outcome");
    }
}
