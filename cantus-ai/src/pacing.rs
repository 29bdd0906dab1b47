//! Request pacing between enrichment calls
//!
//! The orchestrator awaits `Pacer::pace` between records so the model
//! backend's per-caller rate limit is respected. Tests inject `NoPacing`.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::time::Duration;
use tracing::debug;

/// Default pause between enrichment requests
pub const DEFAULT_ENRICHMENT_DELAY: Duration = Duration::from_millis(500);

#[async_trait]
pub trait Pacer: Send + Sync {
    /// Wait until the next request may be issued
    async fn pace(&self);
}

/// Fixed sleep between requests
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_ENRICHMENT_DELAY)
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pace(&self) {
        if !self.delay.is_zero() {
            debug!(delay_ms = self.delay.as_millis() as u64, "Pacing before next request");
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Token-bucket pacing via `governor`
///
/// Unlike `FixedDelay`, time already spent waiting on the backend counts
/// towards the quota, so slow responses are not followed by a full pause.
///
/// The initial token is spent on construction and stands for the first
/// request, which goes out without pacing. Each `pace` then admits at most
/// one request per period.
pub struct QuotaPacer {
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl QuotaPacer {
    /// One request per `period`; `None` for a zero period
    pub fn with_period(period: Duration) -> Option<Self> {
        let rate_limiter = RateLimiter::direct(Quota::with_period(period)?);
        // Burst of one: the bucket is empty afterwards
        let _ = rate_limiter.check();
        Some(Self { rate_limiter })
    }
}

#[async_trait]
impl Pacer for QuotaPacer {
    async fn pace(&self) {
        self.rate_limiter.until_ready().await;
    }
}

/// No pause at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pace(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_default_delay() {
        assert_eq!(FixedDelay::default().delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_period_has_no_quota() {
        assert!(QuotaPacer::with_period(Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn test_fixed_delay_timing() {
        let pacer = FixedDelay::new(Duration::from_millis(100));

        let start = Instant::now();
        pacer.pace().await;
        pacer.pace().await;

        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_quota_pacer_first_pace_waits_full_period() {
        let pacer = QuotaPacer::with_period(Duration::from_millis(300)).unwrap();

        let start = Instant::now();
        pacer.pace().await;
        let first_elapsed = start.elapsed();
        pacer.pace().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed >= Duration::from_millis(250));
        assert!(second_elapsed >= Duration::from_millis(550));
    }

    #[tokio::test]
    async fn test_no_pacing_is_immediate() {
        let start = Instant::now();
        for _ in 0..100 {
            NoPacing.pace().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
