// Outbound rate limiting with a token bucket.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Limits the rate at which the sender hands messages to the SMSC.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Suspends until a send is allowed.
    async fn limit(&self);
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    updated_at: Instant,
    messages_delivered: u32,
    effective_send_rate: f64,
}

/// Token bucket: `send_rate` tokens per second, bucket capacity equal to
/// `send_rate`, refill proportional to elapsed time.
#[derive(Debug)]
pub struct TokenBucket {
    send_rate: f64,
    delay_for_tokens: Duration,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(send_rate: f64) -> Self {
        TokenBucket {
            send_rate,
            delay_for_tokens: Duration::from_secs(1),
            bucket: Mutex::new(Bucket {
                tokens: send_rate,
                updated_at: Instant::now(),
                messages_delivered: 0,
                effective_send_rate: 0.0,
            }),
        }
    }

    fn add_new_tokens(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.updated_at).as_secs_f64();
        if elapsed > 0.0 {
            bucket.effective_send_rate = f64::from(bucket.messages_delivered) / elapsed;
        }
        let new_tokens = elapsed * self.send_rate;
        if new_tokens > 1.0 {
            bucket.tokens = (bucket.tokens + new_tokens).min(self.send_rate);
            bucket.updated_at = now;
            bucket.messages_delivered = 0;
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn limit(&self) {
        let mut bucket = self.bucket.lock().await;
        while bucket.tokens < 1.0 {
            self.add_new_tokens(&mut bucket);
            if bucket.tokens >= 1.0 {
                break;
            }
            debug!(
                send_rate = self.send_rate,
                effective_send_rate = bucket.effective_send_rate,
                "rate limiter delaying send"
            );
            tokio::time::sleep(self.delay_for_tokens).await;
        }
        bucket.messages_delivered += 1;
        bucket.tokens -= 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_is_immediate() {
        let limiter = TokenBucket::new(10.0);
        let started = Instant::now();
        for _ in 0..10 {
            limiter.limit().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn exhausted_bucket_waits_for_refill() {
        let limiter = TokenBucket::new(2.0);
        limiter.limit().await;
        limiter.limit().await;

        // Bucket is empty now; the next acquisition needs a refill cycle.
        let started = Instant::now();
        limiter.limit().await;
        assert!(started.elapsed() >= Duration::from_millis(900));
    }
}
