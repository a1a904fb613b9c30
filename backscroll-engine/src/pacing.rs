//! Delay policies applied between page fetches of a single entity.
//!
//! The paginator asks the policy for a delay before every fetch after the first
//! and before the one retry that follows a rate-limit signal. Sleeping itself
//! goes through [`pause`], which gives up as soon as the cancellation token fires.
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub trait PacingPolicy: Send + Sync {
    /// Delay before the next fetch, given how many pages this scrape already fetched.
    fn page_delay(&self, pages_fetched: usize) -> Duration;

    /// Delay before retrying a rate-limited fetch.
    fn retry_delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_default().max(self.page_delay(1))
    }
}

/// Same spacing between every pair of pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(backscroll_common::DEFAULT_PAGE_DELAY_MS))
    }
}

impl PacingPolicy for FixedDelay {
    fn page_delay(&self, _pages_fetched: usize) -> Duration {
        self.delay
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl PacingPolicy for NoDelay {
    fn page_delay(&self, _pages_fetched: usize) -> Duration {
        Duration::ZERO
    }

    fn retry_delay(&self, _retry_after: Option<Duration>) -> Duration {
        Duration::ZERO
    }
}

/// Returned by [`pause`] when the token fired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Sleep for `delay` unless `cancel` fires first.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), Interrupted> {
    if cancel.is_cancelled() {
        return Err(Interrupted);
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(Interrupted),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_waits_at_least_the_page_delay() {
        let p = FixedDelay::from_millis(1_000);
        assert_eq!(p.retry_delay(None), Duration::from_secs(1));
        assert_eq!(
            p.retry_delay(Some(Duration::from_millis(200))),
            Duration::from_secs(1)
        );
        assert_eq!(
            p.retry_delay(Some(Duration::from_secs(30))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn default_fixed_delay_is_one_second() {
        assert_eq!(FixedDelay::default().page_delay(3), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps_full_delay() {
        let cancel = CancellationToken::new();
        let t0 = tokio::time::Instant::now();
        pause(Duration::from_secs(2), &cancel).await.unwrap();
        assert!(t0.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_is_interrupted_by_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let t0 = tokio::time::Instant::now();
        assert_eq!(pause(Duration::from_secs(60), &cancel).await, Err(Interrupted));
        assert!(t0.elapsed() < Duration::from_secs(60));
    }
}
