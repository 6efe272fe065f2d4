// Enqueue Use Case

use crate::domain::{JobId, MessageJob, Metadata, Priority, PRIORITY_NORMAL};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Enqueue request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub destination: String,
    pub payload: String,

    #[serde(default)]
    pub metadata: Metadata,

    /// Defaults to the middle tier
    #[serde(default)]
    pub priority: Option<Priority>,

    /// Overrides the queue's default attempt budget
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl EnqueueRequest {
    pub fn new(destination: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            payload: payload.into(),
            metadata: Metadata::new(),
            priority: None,
            max_attempts: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Reject malformed jobs before they reach the store
pub fn validate_request(req: &EnqueueRequest) -> Result<()> {
    if req.destination.trim().is_empty() {
        return Err(AppError::Validation(
            "destination cannot be empty".to_string(),
        ));
    }

    if req.payload.trim().is_empty() {
        return Err(AppError::Validation("payload cannot be empty".to_string()));
    }

    if req.max_attempts == Some(0) {
        return Err(AppError::Validation(
            "max_attempts must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Build a `Queued` job with injected id and admission time
pub(crate) fn build_job(
    req: EnqueueRequest,
    id: JobId,
    enqueued_at: i64,
    default_max_attempts: u32,
) -> MessageJob {
    let mut job = MessageJob::new(id, enqueued_at, req.destination, req.payload);
    job.metadata = req.metadata;
    job.priority = req.priority.unwrap_or(PRIORITY_NORMAL);
    job.max_attempts = req.max_attempts.unwrap_or(default_max_attempts);
    job
}
