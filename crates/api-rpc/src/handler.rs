//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to `DispatchQueue` operations.
//! Delivery failures live in job snapshots; only admission errors and
//! unknown job ids become RPC errors.

use crate::error::to_rpc_error;
use crate::types::{
    ClearResponse, ControlResponse, EnqueueBulkRequest, EnqueueBulkResponse, EnqueueRequest,
    EnqueueResponse, JobRequest, StatsResponse,
};
use dispatch_core::application::QueueStatus;
use dispatch_core::domain::{JobSnapshot, JobStatus};
use dispatch_core::error::AppError;
use dispatch_core::DispatchQueue;
use jsonrpsee::types::ErrorObjectOwned;
use std::time::Instant;

/// RPC Handler with injected queue
pub struct RpcHandler {
    queue: DispatchQueue,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(queue: DispatchQueue) -> Self {
        Self {
            queue,
            start_time: Instant::now(),
        }
    }

    /// dispatch.enqueue.v1
    pub async fn enqueue(&self, params: EnqueueRequest) -> Result<EnqueueResponse, ErrorObjectOwned> {
        let job_id = self
            .queue
            .enqueue(params)
            .await
            .map_err(to_rpc_error)?;

        let stats = self.queue.get_stats().await;
        Ok(EnqueueResponse {
            job_id,
            status: JobStatus::Queued,
            queue_length: stats.current_queue_length,
        })
    }

    /// dispatch.enqueue_bulk.v1
    pub async fn enqueue_bulk(
        &self,
        params: EnqueueBulkRequest,
    ) -> Result<EnqueueBulkResponse, ErrorObjectOwned> {
        let job_ids = self
            .queue
            .enqueue_bulk(params.jobs)
            .await
            .map_err(to_rpc_error)?;

        let stats = self.queue.get_stats().await;
        Ok(EnqueueBulkResponse {
            job_ids,
            queue_length: stats.current_queue_length,
        })
    }

    /// dispatch.job.v1
    pub async fn job(&self, params: JobRequest) -> Result<JobSnapshot, ErrorObjectOwned> {
        self.queue.get_job(&params.job_id).await.ok_or_else(|| {
            to_rpc_error(AppError::NotFound(format!("Job {} not found", params.job_id)))
        })
    }

    /// admin.pause.v1
    pub async fn pause(&self) -> Result<ControlResponse, ErrorObjectOwned> {
        self.queue.pause().await;
        Ok(self.control_snapshot().await)
    }

    /// admin.resume.v1
    pub async fn resume(&self) -> Result<ControlResponse, ErrorObjectOwned> {
        self.queue.resume().await;
        Ok(self.control_snapshot().await)
    }

    /// admin.clear.v1
    pub async fn clear(&self) -> Result<ClearResponse, ErrorObjectOwned> {
        let removed = self.queue.clear().await;
        Ok(ClearResponse { removed })
    }

    /// admin.stats.v1
    pub async fn stats(&self) -> Result<StatsResponse, ErrorObjectOwned> {
        Ok(StatsResponse {
            queue: self.queue.get_stats().await,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// admin.queue_status.v1
    pub async fn queue_status(&self) -> Result<QueueStatus, ErrorObjectOwned> {
        Ok(self.queue.get_queue_status().await)
    }

    async fn control_snapshot(&self) -> ControlResponse {
        let stats = self.queue.get_stats().await;
        ControlResponse {
            paused: stats.paused,
            processing: stats.processing,
            queue_length: stats.current_queue_length,
        }
    }
}
