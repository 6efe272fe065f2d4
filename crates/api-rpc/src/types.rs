//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use dispatch_core::application::QueueStats;
use dispatch_core::domain::{JobId, JobStatus};
use serde::{Deserialize, Serialize};

/// dispatch.enqueue.v1 params.
///
/// `destination` and `payload` are required; `metadata` defaults to `{}`,
/// `priority` to 2 and `max_attempts` to the queue's configured budget.
pub use dispatch_core::application::EnqueueRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub queue_length: usize,
}

/// dispatch.enqueue_bulk.v1 - Admit many messages in one call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueBulkRequest {
    pub jobs: Vec<EnqueueRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueBulkResponse {
    pub job_ids: Vec<JobId>,
    pub queue_length: usize,
}

/// dispatch.job.v1 - Inspect one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_id: JobId,
}

/// admin.pause.v1 / admin.resume.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub paused: bool,
    pub processing: bool,
    pub queue_length: usize,
}

/// admin.clear.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// admin.stats.v1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub queue: QueueStats,
    pub uptime_seconds: u64,
}
