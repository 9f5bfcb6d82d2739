// Reconnect timing: truncated exponential backoff between bind attempts.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Times consecutive retries after connection failures.
#[async_trait]
pub trait RetryTimer: Send + Sync {
    /// Suspends for the current delay and arms the next one.
    async fn wait(&self);

    /// Returns the timer to its initial (no-delay) state.
    fn reset(&self);

    /// The delay the next `wait` call will sleep for.
    fn next_delay(&self) -> Duration;
}

/// Truncated exponential backoff: the first retry is immediate, after which
/// the delay starts at `min_delay` and doubles up to
/// `min_delay * 2^max_increases`.
#[derive(Debug)]
pub struct ExponentialBackoff {
    min_delay_ms: u64,
    max_delay_ms: u64,
    next_delay_ms: AtomicU64,
}

impl ExponentialBackoff {
    pub fn new(min_delay: Duration, max_increases: u32) -> Self {
        let min_delay_ms = min_delay.as_millis().max(1) as u64;
        ExponentialBackoff {
            min_delay_ms,
            max_delay_ms: min_delay_ms << max_increases,
            next_delay_ms: AtomicU64::new(0),
        }
    }
}

impl Default for ExponentialBackoff {
    /// 1 s doubling up to 32 s.
    fn default() -> Self {
        Self::new(Duration::from_millis(1000), 5)
    }
}

#[async_trait]
impl RetryTimer for ExponentialBackoff {
    async fn wait(&self) {
        let current = self.next_delay_ms.load(Ordering::Acquire);
        if current == 0 {
            // First failure after a reset retries immediately.
            self.next_delay_ms.store(self.min_delay_ms, Ordering::Release);
            return;
        }
        debug!(delay_ms = current, "delaying before retry");
        tokio::time::sleep(Duration::from_millis(current)).await;
        if current < self.max_delay_ms {
            self.next_delay_ms
                .store((current * 2).min(self.max_delay_ms), Ordering::Release);
        }
    }

    fn reset(&self) {
        self.next_delay_ms.store(0, Ordering::Release);
    }

    fn next_delay(&self) -> Duration {
        Duration::from_millis(self.next_delay_ms.load(Ordering::Acquire))
    }
}
