// Delivery Log Port
// Terminal outcomes are handed to an external log; the queue never reads them back.

use crate::domain::{DispatchOutcome, JobId, JobStatus, MessageJob, Metadata};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One terminal job outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub job_id: JobId,
    pub destination: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub metadata: Metadata,
    pub outcome: Option<DispatchOutcome>,
    pub enqueued_at: i64,
    pub finished_at: Option<i64>,
}

impl From<&MessageJob> for DeliveryRecord {
    fn from(job: &MessageJob) -> Self {
        Self {
            job_id: job.id.clone(),
            destination: job.destination.clone(),
            status: job.status,
            attempts: job.attempts,
            metadata: job.metadata.clone(),
            outcome: job.last_result.clone(),
            enqueued_at: job.enqueued_at,
            finished_at: job.finished_at,
        }
    }
}

#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Record a job that reached `Sent` or `Failed`
    async fn record(&self, record: &DeliveryRecord) -> Result<()>;
}

/// Discards every record (default when no log is configured)
pub struct NullDeliveryLog;

#[async_trait]
impl DeliveryLog for NullDeliveryLog {
    async fn record(&self, _record: &DeliveryRecord) -> Result<()> {
        Ok(())
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Keeps records in memory so tests can inspect them
    #[derive(Default)]
    pub struct MemoryDeliveryLog {
        records: Mutex<Vec<DeliveryRecord>>,
    }

    impl MemoryDeliveryLog {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn records(&self) -> Vec<DeliveryRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeliveryLog for MemoryDeliveryLog {
        async fn record(&self, record: &DeliveryRecord) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    /// Rejects every write, counting how many were attempted
    #[derive(Default)]
    pub struct FailingDeliveryLog {
        attempts: Mutex<usize>,
    }

    impl FailingDeliveryLog {
        pub fn new() -> Self {
            Self::default()
        }
        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl DeliveryLog for FailingDeliveryLog {
        async fn record(&self, _record: &DeliveryRecord) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;
            Err(std::io::Error::other("disk full").into())
        }
    }
}
