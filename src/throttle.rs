// Adaptive outbound admission control driven by the SMSC's throttling
// responses (ESME_RTHROTTLED, ESME_RMSGQFUL).

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Self-imposed throttling. The receiver feeds every response in through
/// `throttled`/`not_throttled`; the sender asks `allow_request` before each
/// dequeue and sleeps `throttle_delay` when denied.
#[async_trait]
pub trait ThrottleHandler: Send + Sync {
    async fn throttled(&self);

    async fn not_throttled(&self);

    async fn allow_request(&self) -> bool;

    async fn throttle_delay(&self) -> Duration;
}

#[derive(Debug)]
struct Counters {
    throttle_responses: u32,
    non_throttle_responses: u32,
    updated_at: Instant,
}

/// Sliding-window percent-throttled handler: deny sending while the
/// fraction of throttling responses over the sampling period exceeds
/// `deny_request_at` percent, given at least `sample_size` responses.
#[derive(Debug)]
pub struct WindowedThrottle {
    sampling_period: Duration,
    sample_size: u32,
    deny_request_at: f64,
    throttle_wait: Duration,
    counters: Mutex<Counters>,
}

impl WindowedThrottle {
    pub fn new(
        sampling_period: Duration,
        sample_size: u32,
        deny_request_at: f64,
        throttle_wait: Duration,
    ) -> Self {
        WindowedThrottle {
            sampling_period,
            sample_size,
            deny_request_at,
            throttle_wait,
            counters: Mutex::new(Counters {
                throttle_responses: 0,
                non_throttle_responses: 0,
                updated_at: Instant::now(),
            }),
        }
    }

    fn percent_throttles(counters: &Counters, sample_size: u32) -> f64 {
        let total = counters.throttle_responses + counters.non_throttle_responses;
        if total < sample_size {
            // Not enough data for a decision, assume the happy case.
            return 0.0;
        }
        (f64::from(counters.throttle_responses) / f64::from(total) * 10_000.0).round() / 100.0
    }
}

impl Default for WindowedThrottle {
    /// 180 s window, 50-response minimum sample, deny above 1 %, 3 s wait.
    fn default() -> Self {
        Self::new(Duration::from_secs(180), 50, 1.0, Duration::from_secs(3))
    }
}

#[async_trait]
impl ThrottleHandler for WindowedThrottle {
    async fn throttled(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.throttle_responses += 1;
    }

    async fn not_throttled(&self) {
        let mut counters = self.counters.lock().unwrap();
        counters.non_throttle_responses += 1;
    }

    async fn allow_request(&self) -> bool {
        let mut counters = self.counters.lock().unwrap();
        // The decision uses the counts as they stand; the window is reset
        // afterwards once it has rolled over.
        let percent = Self::percent_throttles(&counters, self.sample_size);
        let throttle_responses = counters.throttle_responses;
        let non_throttle_responses = counters.non_throttle_responses;

        if counters.updated_at.elapsed() > self.sampling_period {
            counters.throttle_responses = 0;
            counters.non_throttle_responses = 0;
            counters.updated_at = Instant::now();
        }
        drop(counters);

        let allowed = percent <= self.deny_request_at;
        if allowed {
            debug!(
                percent_throttles = percent,
                throttle_responses, non_throttle_responses, "throttle check passed"
            );
        } else {
            warn!(
                percent_throttles = percent,
                throttle_responses, non_throttle_responses, "throttle check denied request"
            );
        }
        allowed
    }

    async fn throttle_delay(&self) -> Duration {
        self.throttle_wait
    }
}
