// Retry Policy
// Classifies a Transport failure and decides what happens to the job
use crate::domain::{MessageJob, RequeuePlacement};
use crate::port::TransportError;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Put the job back into the store at the given placement
    Retry(RequeuePlacement),
    /// Do not retry, job has failed permanently
    Failed(FailureReason),
}

/// Why a job was failed instead of retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport reported a permanent fault
    NonRetryable,
    /// Transient fault, but every attempt has been used
    AttemptsExhausted,
}

/// Retry policy
///
/// Determines if a failed job should be retried based on:
/// - The error class reported by the Transport
/// - Current attempt count vs. the job's attempt budget
pub struct RetryPolicy {
    placement: RequeuePlacement,
}

impl RetryPolicy {
    pub fn new(placement: RequeuePlacement) -> Self {
        Self { placement }
    }

    pub fn placement(&self) -> RequeuePlacement {
        self.placement
    }

    /// Decide the fate of a job whose latest attempt failed
    ///
    /// `job.attempts` already counts the failed attempt.
    pub fn decide(&self, job: &MessageJob, error: &TransportError) -> RetryDecision {
        if error.is_permanent() {
            warn!(
                job_id = %job.id,
                attempt = job.attempts,
                error = %error,
                "Non-retryable delivery failure"
            );
            return RetryDecision::Failed(FailureReason::NonRetryable);
        }

        if !job.has_attempts_left() {
            warn!(
                job_id = %job.id,
                attempts = job.attempts,
                max_attempts = job.max_attempts,
                error = %error,
                "Max delivery attempts reached"
            );
            return RetryDecision::Failed(FailureReason::AttemptsExhausted);
        }

        info!(
            job_id = %job.id,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            placement = ?self.placement,
            error = %error,
            "Scheduling retry"
        );
        RetryDecision::Retry(self.placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempted(attempts: u32, max_attempts: u32) -> MessageJob {
        let mut job = MessageJob::new("job-1", 0, "guardian:7", "Attendance report");
        job.attempts = attempts;
        job.max_attempts = max_attempts;
        job
    }

    #[test]
    fn test_permanent_error_never_retried() {
        let policy = RetryPolicy::new(RequeuePlacement::Tail);
        let job = attempted(1, 3);
        let err = TransportError::Permanent("number not registered".to_string());

        assert_eq!(
            policy.decide(&job, &err),
            RetryDecision::Failed(FailureReason::NonRetryable)
        );
    }

    #[test]
    fn test_transient_error_retried_with_budget_left() {
        let policy = RetryPolicy::new(RequeuePlacement::Tail);
        let job = attempted(2, 3);
        let err = TransportError::Transient("connection reset".to_string());

        assert_eq!(
            policy.decide(&job, &err),
            RetryDecision::Retry(RequeuePlacement::Tail)
        );
    }

    #[test]
    fn test_transient_error_fails_when_exhausted() {
        let policy = RetryPolicy::new(RequeuePlacement::Priority);
        let job = attempted(3, 3);
        let err = TransportError::Transient("503 from gateway".to_string());

        assert_eq!(
            policy.decide(&job, &err),
            RetryDecision::Failed(FailureReason::AttemptsExhausted)
        );
    }

    #[test]
    fn test_placement_follows_configuration() {
        let policy = RetryPolicy::new(RequeuePlacement::Priority);
        let job = attempted(1, 3);
        let err = TransportError::Transient("timeout".to_string());

        assert_eq!(
            policy.decide(&job, &err),
            RetryDecision::Retry(RequeuePlacement::Priority)
        );
    }
}
