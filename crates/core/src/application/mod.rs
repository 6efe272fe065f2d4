// Application Layer - Use Cases and Business Logic

pub mod dispatch;
pub mod rate_limiter;
pub mod retry;
pub mod scheduler;
pub mod stats;

// Re-exports
pub use dispatch::{DispatchQueue, EnqueueRequest};
pub use stats::{QueueStats, QueueStatus};
