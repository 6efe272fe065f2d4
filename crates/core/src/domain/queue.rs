// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default transport ceiling (messages per minute)
pub const DEFAULT_MESSAGES_PER_MINUTE: u32 = 256;

/// Default per-job attempt budget
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Safety margin added on top of the raw per-message interval (percent)
pub const PACING_SAFETY_MARGIN_PERCENT: u64 = 10;

/// Finished jobs kept in memory for `get_job` lookups
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Where a transiently failed job goes back into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeuePlacement {
    /// Append to the tail without re-sorting; the job regains its priority
    /// position the next time any job is admitted
    #[default]
    Tail,
    /// Insert at its priority position immediately (after equal priorities)
    Priority,
}

impl std::str::FromStr for RequeuePlacement {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tail" => Ok(RequeuePlacement::Tail),
            "priority" => Ok(RequeuePlacement::Priority),
            other => Err(DomainError::InvalidConfig(format!(
                "unknown requeue placement '{}' (expected 'tail' or 'priority')",
                other
            ))),
        }
    }
}

/// Queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Hard ceiling imposed by the external transport
    pub messages_per_minute: u32,
    /// Attempt budget for jobs that do not override it
    pub default_max_attempts: u32,
    pub requeue_placement: RequeuePlacement,
    /// Upper bound on a single Transport call; `None` waits forever
    pub send_timeout: Option<Duration>,
    pub history_limit: usize,
    /// Admit jobs but hold the drain loop until `resume()`
    pub start_paused: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            messages_per_minute: DEFAULT_MESSAGES_PER_MINUTE,
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
            requeue_placement: RequeuePlacement::Tail,
            send_timeout: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            start_paused: false,
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.messages_per_minute == 0 {
            return Err(DomainError::InvalidConfig(
                "messages_per_minute must be greater than zero".to_string(),
            ));
        }
        if self.default_max_attempts == 0 {
            return Err(DomainError::InvalidConfig(
                "default_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.send_timeout == Some(Duration::ZERO) {
            return Err(DomainError::InvalidConfig(
                "send_timeout must be non-zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
