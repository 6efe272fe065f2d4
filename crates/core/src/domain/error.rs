// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid job status transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Attempt budget exhausted for job {id} ({max_attempts} attempts)")]
    AttemptsExhausted { id: String, max_attempts: u32 },

    #[error("Invalid queue configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
