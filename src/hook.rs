// Application hooks: the callbacks through which the session reports
// traffic and per-message outcomes. Hook errors never abort the session.

use crate::client::EsmeError;
use crate::datatypes::SubmitSm;
use crate::frame::Pdu;
use async_trait::async_trait;
use tracing::{debug, trace};

/// Callbacks into the embedding application. All methods may suspend.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Called just before a PDU goes out on the wire.
    async fn sending(&self, pdu: &Pdu, wire: &[u8], client_id: &str);

    /// Called for every inbound PDU. `pdu` is `None` when the bytes could
    /// not be parsed. Delivery receipts arrive here with `log_id` and
    /// `extra_data` resolved from the originating submit.
    async fn received(&self, pdu: Option<&Pdu>, wire: &[u8], client_id: &str);

    /// Called exactly once per failed outbound submit: build or validation
    /// errors, transmit errors, and response timeouts.
    async fn send_error(&self, message: &SubmitSm, error: &EsmeError, client_id: &str);
}

/// Default hook: logs the traffic and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHook;

#[async_trait]
impl Hook for LogHook {
    async fn sending(&self, pdu: &Pdu, wire: &[u8], client_id: &str) {
        trace!(client_id, %pdu, wire_len = wire.len(), "sending PDU");
    }

    async fn received(&self, pdu: Option<&Pdu>, wire: &[u8], client_id: &str) {
        match pdu {
            Some(pdu) => trace!(client_id, %pdu, wire_len = wire.len(), "received PDU"),
            None => trace!(client_id, wire_len = wire.len(), "received unparseable PDU"),
        }
    }

    async fn send_error(&self, message: &SubmitSm, error: &EsmeError, client_id: &str) {
        debug!(
            client_id,
            log_id = %message.log_id,
            %error,
            "send error"
        );
    }
}
