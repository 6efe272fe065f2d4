// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use job::{
    DispatchOutcome, JobId, JobSnapshot, JobStatus, MessageJob, Metadata, Priority, PRIORITY_HIGH,
    PRIORITY_LOW, PRIORITY_NORMAL,
};
pub use queue::{QueueConfig, RequeuePlacement};
