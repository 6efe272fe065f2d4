//! Scheduler - Job Store ordered by priority tier
//!
//! Every admission appends the job and re-runs a full stable sort, so equal
//! priorities keep arrival order. Requeued retries bypass the sort when the
//! placement is `Tail` and only regain their priority slot on the next
//! admission.

use crate::domain::{JobId, JobSnapshot, MessageJob, RequeuePlacement};
use std::collections::VecDeque;
use tracing::debug;

/// Pending jobs, head first. Only holds `Queued`/`Retrying` jobs.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: VecDeque<MessageJob>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a job and re-sort the whole store by priority
    pub fn admit(&mut self, job: MessageJob) {
        debug!(job_id = %job.id, priority = job.priority, "Admitting job");
        self.jobs.push_back(job);
        self.resort();
    }

    /// Put a retrying job back into the store
    pub fn requeue(&mut self, job: MessageJob, placement: RequeuePlacement) {
        match placement {
            RequeuePlacement::Tail => self.jobs.push_back(job),
            RequeuePlacement::Priority => {
                // After every job of equal or higher urgency
                let index = self.jobs.partition_point(|j| j.priority <= job.priority);
                self.jobs.insert(index, job);
            }
        }
    }

    /// Remove and return the head job
    pub fn pop_head(&mut self) -> Option<MessageJob> {
        self.jobs.pop_front()
    }

    pub fn peek_head(&self) -> Option<&MessageJob> {
        self.jobs.front()
    }

    /// Discard every pending job, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.jobs.len();
        self.jobs.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn find(&self, id: &JobId) -> Option<&MessageJob> {
        self.jobs.iter().find(|j| &j.id == id)
    }

    pub fn snapshot(&self) -> Vec<JobSnapshot> {
        self.jobs.iter().map(JobSnapshot::from).collect()
    }

    fn resort(&mut self) {
        // slice::sort_by_key is stable
        self.jobs.make_contiguous().sort_by_key(|j| j.priority);
    }
}
