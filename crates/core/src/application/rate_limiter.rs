//! Rate Limiter (fixed inter-item pacing)
//!
//! Derives one fixed delay from the transport's messages-per-minute ceiling
//! plus a safety margin. The drain loop waits that long after every processed
//! job before starting the next one. Only one job is ever in flight, so no
//! burst allowance is needed.

use crate::domain::error::{DomainError, Result};
use crate::domain::queue::PACING_SAFETY_MARGIN_PERCENT;
use std::time::Duration;
use tokio::time::Instant;

/// Pacing delay in ms: `ceil(60000 * (1 + margin) / messages_per_minute)`
///
/// 256 msg/min -> 258 ms
pub fn pacing_delay_ms(messages_per_minute: u32) -> Result<u64> {
    if messages_per_minute == 0 {
        return Err(DomainError::InvalidConfig(
            "messages_per_minute must be greater than zero".to_string(),
        ));
    }
    let numerator = 60_000u64 * (100 + PACING_SAFETY_MARGIN_PERCENT);
    Ok(numerator.div_ceil(100 * messages_per_minute as u64))
}

/// Fixed-delay pacer
#[derive(Debug, Clone)]
pub struct RateLimiter {
    messages_per_minute: u32,
    delay: Duration,
}

impl RateLimiter {
    /// Create a pacer for the given transport ceiling
    ///
    /// # Errors
    /// DomainError::InvalidConfig when `messages_per_minute` is zero
    pub fn new(messages_per_minute: u32) -> Result<Self> {
        let delay_ms = pacing_delay_ms(messages_per_minute)?;
        Ok(Self {
            messages_per_minute,
            delay: Duration::from_millis(delay_ms),
        })
    }

    pub fn messages_per_minute(&self) -> u32 {
        self.messages_per_minute
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Time still to wait before the next dispatch may start
    ///
    /// `last_completed` is when the previous job finished processing.
    pub fn remaining(&self, last_completed: Option<Instant>, now: Instant) -> Duration {
        match last_completed {
            Some(at) => (at + self.delay).saturating_duration_since(now),
            None => Duration::ZERO,
        }
    }

    /// `queue_length x delay`
    pub fn estimated_drain_ms(&self, queue_length: usize) -> u64 {
        self.delay_ms().saturating_mul(queue_length as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceiling_delay() {
        assert_eq!(pacing_delay_ms(256).unwrap(), 258);
    }

    #[test]
    fn test_delay_rounds_up() {
        // 60000 * 1.1 / 60 = 1100 exactly
        assert_eq!(pacing_delay_ms(60).unwrap(), 1100);
        // 66000 / 7 = 9428.57...
        assert_eq!(pacing_delay_ms(7).unwrap(), 9429);
        // 66000 / 80 = 825
        assert_eq!(pacing_delay_ms(80).unwrap(), 825);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(pacing_delay_ms(0).is_err());
        assert!(RateLimiter::new(0).is_err());
    }

    #[test]
    fn test_estimated_drain() {
        let limiter = RateLimiter::new(256).unwrap();
        assert_eq!(limiter.delay_ms(), 258);
        assert_eq!(limiter.estimated_drain_ms(0), 0);
        assert_eq!(limiter.estimated_drain_ms(10), 2580);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_from_last_completion() {
        let limiter = RateLimiter::new(256).unwrap();
        let start = Instant::now();

        assert_eq!(limiter.remaining(None, start), Duration::ZERO);
        assert_eq!(
            limiter.remaining(Some(start), start),
            Duration::from_millis(258)
        );

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(
            limiter.remaining(Some(start), Instant::now()),
            Duration::from_millis(58)
        );

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(limiter.remaining(Some(start), Instant::now()), Duration::ZERO);
    }
}
