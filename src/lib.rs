//! An asynchronous SMPP v3.4 client (ESME): a long-lived, reconnecting
//! session that binds to an SMSC over TCP and exchanges binary PDUs to
//! deliver and receive SMS.
//!
//! The crate is organized along the protocol's layers:
//!
//! * [`encoding`] — SMS text codecs (GSM 03.38 unpacked and packed, UCS-2,
//!   ASCII, Latin-1) and concatenated-SMS segmentation;
//! * [`codec`] and [`datatypes`] — the binary PDU codec and the typed
//!   message structs;
//! * [`frame`] — the [`frame::Pdu`] sum type over every supported message;
//! * [`correlator`] — time-bounded request/response correlation and the
//!   persistent delivery map for receipts that arrive days later;
//! * [`client`] — the session engine: bind lifecycle, the receiver /
//!   sender / keep-alive task trio, reconnection with backoff, and
//!   graceful shutdown;
//! * collaborator contracts an application can replace: [`broker::Broker`],
//!   [`hook::Hook`], [`correlator::Correlator`], [`ratelimit::RateLimiter`],
//!   [`throttle::ThrottleHandler`], [`sequence::SequenceGenerator`] and
//!   [`retry::RetryTimer`].

pub mod broker;
pub mod client;
pub mod codec;
pub mod connection;
pub mod correlator;
pub mod datatypes;
pub mod encoding;
pub mod frame;
pub mod hook;
pub mod ratelimit;
pub mod retry;
pub mod sequence;
pub mod throttle;

pub(crate) mod macros;

#[cfg(test)]
mod tests;

pub use client::{Esme, EsmeBuilder, EsmeConfig, EsmeError, EsmeResult, SessionState};
pub use codec::{CodecError, Decodable, Encodable, PduHeader};
pub use datatypes::{
    BindMode, CommandId, CommandStatus, DeliverSm, DeliveryReceipt, Npi, PhoneNumber, SubmitSm,
    SubmitSmResp, Ton,
};
pub use frame::Pdu;
