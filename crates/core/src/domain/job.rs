// Message Job Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4 in production, injected via IdProvider)
pub type JobId = String;

/// Priority tier (lower number = more urgent)
pub type Priority = i32;

/// Fee reminders, receipts and other time-critical notices
pub const PRIORITY_HIGH: Priority = 1;

/// Default tier when the producer does not specify one
pub const PRIORITY_NORMAL: Priority = 2;

/// Digest-style notices (attendance reports, bulk announcements)
pub const PRIORITY_LOW: Priority = 3;

/// Caller bookkeeping, echoed back in snapshots and never interpreted
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Job Status
///
/// `Sent` and `Failed` are terminal. A job inside the store is always
/// `Queued` or `Retrying`; `Dispatching` only exists during the Transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Dispatching,
    Sent,
    Retrying,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Sent | JobStatus::Failed)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Retrying)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Dispatching => write!(f, "DISPATCHING"),
            JobStatus::Sent => write!(f, "SENT"),
            JobStatus::Retrying => write!(f, "RETRYING"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Most recent Transport outcome for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Failed {
        error: String,
        permanent: bool,
    },
}

/// One unit of outbound work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageJob {
    pub id: JobId,
    pub destination: String,
    pub payload: String,
    pub metadata: Metadata,
    pub priority: Priority,
    pub status: JobStatus,

    pub attempts: u32,
    pub max_attempts: u32,

    pub enqueued_at: i64, // epoch ms
    pub finished_at: Option<i64>,
    pub last_result: Option<DispatchOutcome>,
}

impl MessageJob {
    /// Create a new job in `Queued` status
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `enqueued_at` - Admission timestamp in epoch ms (injected, not system time)
    /// * `destination` - Pre-validated opaque address
    /// * `payload` - Opaque content passed verbatim to the Transport
    pub fn new(
        id: impl Into<String>,
        enqueued_at: i64,
        destination: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            payload: payload.into(),
            metadata: Metadata::new(),
            priority: PRIORITY_NORMAL,
            status: JobStatus::Queued,
            attempts: 0,
            max_attempts: crate::domain::queue::DEFAULT_MAX_ATTEMPTS,
            enqueued_at,
            finished_at: None,
            last_result: None,
        }
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Pending -> Dispatching, consuming one attempt
    pub fn begin_attempt(&mut self) -> Result<()> {
        if !self.status.is_pending() {
            return Err(self.transition_error(JobStatus::Dispatching));
        }
        if !self.has_attempts_left() {
            return Err(DomainError::AttemptsExhausted {
                id: self.id.clone(),
                max_attempts: self.max_attempts,
            });
        }
        self.status = JobStatus::Dispatching;
        self.attempts += 1;
        Ok(())
    }

    /// Dispatching -> Sent
    pub fn mark_sent(&mut self, message_id: Option<String>, now_millis: i64) -> Result<()> {
        self.expect_dispatching(JobStatus::Sent)?;
        self.status = JobStatus::Sent;
        self.finished_at = Some(now_millis);
        self.last_result = Some(DispatchOutcome::Delivered { message_id });
        Ok(())
    }

    /// Dispatching -> Retrying (job goes back into the store)
    pub fn mark_retrying(&mut self, error: impl Into<String>) -> Result<()> {
        self.expect_dispatching(JobStatus::Retrying)?;
        self.status = JobStatus::Retrying;
        self.last_result = Some(DispatchOutcome::Failed {
            error: error.into(),
            permanent: false,
        });
        Ok(())
    }

    /// Mark as Failed with explicit timestamp
    ///
    /// Unconditional: a job can fail from any non-terminal status.
    pub fn fail(&mut self, error: impl Into<String>, permanent: bool, now_millis: i64) {
        self.status = JobStatus::Failed;
        self.finished_at = Some(now_millis);
        self.last_result = Some(DispatchOutcome::Failed {
            error: error.into(),
            permanent,
        });
    }

    fn expect_dispatching(&self, to: JobStatus) -> Result<()> {
        if self.status != JobStatus::Dispatching {
            return Err(self.transition_error(to));
        }
        Ok(())
    }

    fn transition_error(&self, to: JobStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

/// Read-only view of a job for status endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub priority: Priority,
    pub attempts: u32,
    pub max_attempts: u32,
    pub enqueued_at: i64,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<DispatchOutcome>,
}

impl From<&MessageJob> for JobSnapshot {
    fn from(job: &MessageJob) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            priority: job.priority,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            enqueued_at: job.enqueued_at,
            metadata: job.metadata.clone(),
            finished_at: job.finished_at,
            last_result: job.last_result.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> MessageJob {
        MessageJob::new("job-1", 1_000, "student:42", "Fee reminder")
    }

    #[test]
    fn test_new_job_defaults() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.priority, PRIORITY_NORMAL);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.max_attempts, 3);
        assert!(job.last_result.is_none());
    }

    #[test]
    fn test_attempt_then_sent() {
        let mut job = job();
        job.begin_attempt().unwrap();
        assert_eq!(job.status, JobStatus::Dispatching);
        assert_eq!(job.attempts, 1);

        job.mark_sent(Some("wamid-1".to_string()), 2_000).unwrap();
        assert_eq!(job.status, JobStatus::Sent);
        assert_eq!(job.finished_at, Some(2_000));
        assert_eq!(
            job.last_result,
            Some(DispatchOutcome::Delivered {
                message_id: Some("wamid-1".to_string())
            })
        );
    }

    #[test]
    fn test_retrying_job_can_be_attempted_again() {
        let mut job = job();
        job.begin_attempt().unwrap();
        job.mark_retrying("gateway timeout").unwrap();
        assert!(job.status.is_pending());

        job.begin_attempt().unwrap();
        assert_eq!(job.attempts, 2);
    }

    #[test]
    fn test_attempts_never_exceed_max() {
        let mut job = job();
        job.max_attempts = 1;
        job.begin_attempt().unwrap();
        job.mark_retrying("boom").unwrap();

        let err = job.begin_attempt().unwrap_err();
        assert!(matches!(err, DomainError::AttemptsExhausted { .. }));
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn test_sent_requires_dispatching() {
        let mut job = job();
        let err = job.mark_sent(None, 2_000).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid job status transition: QUEUED -> SENT"
        );
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&JobStatus::Dispatching).unwrap();
        assert_eq!(json, "\"DISPATCHING\"");
    }
}
