// Stats & status snapshots

use crate::domain::{JobId, JobSnapshot, MessageJob};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Cumulative counters, mutated only by admission and the drain loop
#[derive(Debug, Default, Clone)]
pub struct StatsCounters {
    pub total_queued: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    /// Processed attempts (sent + failed + retried)
    pub processed: u64,
    pub average_processing_ms: f64,
    pub last_processed_at: Option<i64>,
}

impl StatsCounters {
    /// Fold one processed attempt into the running average
    pub fn record_processing(&mut self, elapsed: Duration, now_millis: i64) {
        self.processed += 1;
        let sample = elapsed.as_secs_f64() * 1000.0;
        // Incremental mean; processed >= 1 here
        self.average_processing_ms += (sample - self.average_processing_ms) / self.processed as f64;
        self.last_processed_at = Some(now_millis);
    }
}

/// Recently finished jobs, oldest evicted first
#[derive(Debug)]
pub struct FinishedJobs {
    jobs: VecDeque<MessageJob>,
    limit: usize,
}

impl FinishedJobs {
    pub fn new(limit: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(limit.min(1024)),
            limit,
        }
    }

    pub fn push(&mut self, job: MessageJob) {
        if self.limit == 0 {
            return;
        }
        while self.jobs.len() >= self.limit {
            self.jobs.pop_front();
        }
        self.jobs.push_back(job);
    }

    pub fn find(&self, id: &JobId) -> Option<&MessageJob> {
        // Newest first
        self.jobs.iter().rev().find(|j| &j.id == id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// get_stats response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_queued: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    pub current_queue_length: usize,
    pub processing: bool,
    pub paused: bool,
    pub average_processing_ms: f64,
    pub last_processed_at: Option<i64>,
    pub estimated_time_remaining_ms: u64,
    pub messages_per_minute: u32,
    pub delay_ms: u64,
}

/// get_queue_status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queue_length: usize,
    pub processing: bool,
    pub paused: bool,
    pub in_flight: Option<JobSnapshot>,
    pub items: Vec<JobSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_starts_at_zero() {
        let counters = StatsCounters::default();
        assert_eq!(counters.processed, 0);
        assert_eq!(counters.average_processing_ms, 0.0);
        assert!(counters.last_processed_at.is_none());
    }

    #[test]
    fn test_running_average() {
        let mut counters = StatsCounters::default();
        counters.record_processing(Duration::from_millis(100), 1_000);
        counters.record_processing(Duration::from_millis(300), 2_000);
        counters.record_processing(Duration::from_millis(200), 3_000);

        assert_eq!(counters.processed, 3);
        assert!((counters.average_processing_ms - 200.0).abs() < 1e-9);
        assert_eq!(counters.last_processed_at, Some(3_000));
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = FinishedJobs::new(2);
        history.push(MessageJob::new("a", 0, "d", "p"));
        history.push(MessageJob::new("b", 0, "d", "p"));
        history.push(MessageJob::new("c", 0, "d", "p"));

        assert_eq!(history.len(), 2);
        assert!(history.find(&"a".to_string()).is_none());
        assert!(history.find(&"c".to_string()).is_some());
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut history = FinishedJobs::new(0);
        history.push(MessageJob::new("a", 0, "d", "p"));
        assert!(history.is_empty());
    }
}
