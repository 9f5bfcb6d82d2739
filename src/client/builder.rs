// Session assembly: wires the configuration and the pluggable
// collaborators into an `Esme`, substituting the in-crate defaults for
// anything not supplied.

use crate::broker::{Broker, MemoryBroker};
use crate::client::config::EsmeConfig;
use crate::client::error::EsmeResult;
use crate::client::session::{Esme, EsmeInner};
use crate::correlator::{Correlator, SimpleCorrelator};
use crate::encoding::{CodecRegistry, EncodingConfig, TextCodec};
use crate::hook::{Hook, LogHook};
use crate::ratelimit::RateLimiter;
use crate::retry::{ExponentialBackoff, RetryTimer};
use crate::sequence::{MonotonicSequence, SequenceGenerator};
use crate::throttle::{ThrottleHandler, WindowedThrottle};
use std::sync::Arc;

/// Builder for [`Esme`] sessions.
///
/// ```rust,no_run
/// use esme::client::{Esme, EsmeConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let esme = Esme::builder(EsmeConfig::new("127.0.0.1", 2775, "system_id", "password"))
///     .build()?;
///
/// let session = esme.clone();
/// tokio::spawn(async move { session.start().await });
/// # Ok(())
/// # }
/// ```
pub struct EsmeBuilder {
    config: EsmeConfig,
    hook: Option<Arc<dyn Hook>>,
    broker: Option<Arc<dyn Broker>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    throttle: Option<Arc<dyn ThrottleHandler>>,
    correlator: Option<Arc<dyn Correlator>>,
    sequence: Option<Arc<dyn SequenceGenerator>>,
    retry_timer: Option<Arc<dyn RetryTimer>>,
    custom_codecs: Vec<Arc<dyn TextCodec>>,
}

impl EsmeBuilder {
    pub fn new(config: EsmeConfig) -> Self {
        EsmeBuilder {
            config,
            hook: None,
            broker: None,
            rate_limiter: None,
            throttle: None,
            correlator: None,
            sequence: None,
            retry_timer: None,
            custom_codecs: Vec::new(),
        }
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    pub fn throttle_handler(mut self, throttle: Arc<dyn ThrottleHandler>) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn correlator(mut self, correlator: Arc<dyn Correlator>) -> Self {
        self.correlator = Some(correlator);
        self
    }

    pub fn sequence_generator(mut self, sequence: Arc<dyn SequenceGenerator>) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn retry_timer(mut self, retry_timer: Arc<dyn RetryTimer>) -> Self {
        self.retry_timer = Some(retry_timer);
        self
    }

    /// Registers a user codec; it shadows a built-in of the same name.
    pub fn codec(mut self, codec: Arc<dyn TextCodec>) -> Self {
        self.custom_codecs.push(codec);
        self
    }

    pub fn build(self) -> EsmeResult<Esme> {
        let mut registry = CodecRegistry::new();
        for codec in self.custom_codecs {
            registry.register(codec);
        }
        self.config.validate(&registry)?;
        let encoding = EncodingConfig {
            default_encoding: self.config.default_encoding.clone(),
            registry,
        };

        let hook: Arc<dyn Hook> = self.hook.unwrap_or_else(|| Arc::new(LogHook));
        let correlator: Arc<dyn Correlator> = self
            .correlator
            .unwrap_or_else(|| Arc::new(SimpleCorrelator::in_memory()));
        correlator.attach(Arc::clone(&hook), self.config.client_id.clone());

        let inner = EsmeInner::new(
            self.config,
            encoding,
            hook,
            self.broker
                .unwrap_or_else(|| Arc::new(MemoryBroker::default())),
            self.rate_limiter,
            self.throttle
                .unwrap_or_else(|| Arc::new(WindowedThrottle::default())),
            correlator,
            self.sequence
                .unwrap_or_else(|| Arc::new(MonotonicSequence::new())),
            self.retry_timer
                .unwrap_or_else(|| Arc::new(ExponentialBackoff::default())),
        );
        Ok(Esme::from_inner(inner))
    }
}

impl Esme {
    /// Starts building a session over `config`.
    pub fn builder(config: EsmeConfig) -> EsmeBuilder {
        EsmeBuilder::new(config)
    }

    /// Builds a session with the default collaborators.
    pub fn new(config: EsmeConfig) -> EsmeResult<Esme> {
        EsmeBuilder::new(config).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::SessionState;

    #[test]
    fn builds_with_defaults() {
        let esme = Esme::new(EsmeConfig::new("127.0.0.1", 2775, "testuser", "password")).unwrap();
        assert_eq!(esme.session_state(), SessionState::Closed);
        assert_eq!(esme.client_id().len(), 17);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EsmeConfig::new("127.0.0.1", 2775, "a_system_id_that_is_too_long", "pw");
        assert!(Esme::new(config).is_err());
    }
}
