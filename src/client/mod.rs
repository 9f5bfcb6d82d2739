//! The SMPP client session: configuration, the reconnecting session engine
//! and its error types.
//!
//! A session is built from an [`EsmeConfig`] plus optional collaborator
//! implementations (broker, hook, correlator, rate limiter, throttle
//! handler, sequence generator, retry timer), then driven by `start`:
//!
//! ```rust,no_run
//! use esme::client::{Esme, EsmeConfig};
//! use esme::datatypes::{PhoneNumber, SubmitSm};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let esme = Esme::new(EsmeConfig::new("127.0.0.1", 2775, "system_id", "password"))?;
//!
//! let session = esme.clone();
//! let runner = tokio::spawn(async move { session.start().await });
//!
//! let message = SubmitSm::new(
//!     "Hello over SMPP",
//!     PhoneNumber::alphanumeric("INFO")?,
//!     PhoneNumber::international("+123135654618")?,
//! );
//! esme.enqueue(message).await;
//!
//! esme.stop().await;
//! runner.await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod session;

pub use builder::EsmeBuilder;
pub use config::EsmeConfig;
pub use error::{EsmeError, EsmeResult};
pub use session::{Esme, SessionState};
