// Session-level error types and their fatality classification.

use crate::codec::CodecError;
use crate::datatypes::{CommandId, CommandStatus};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the session engine and its collaborators.
#[derive(Debug, Error)]
pub enum EsmeError {
    /// A PDU could not be parsed or built.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The peer answered with an unexpected command or a non-OK status
    /// where only OK (or ALYBND on bind) is acceptable.
    #[error("SMSC returned {command:?} with status {status:?}")]
    Protocol {
        command: CommandId,
        status: CommandStatus,
    },

    /// TCP-level failure: connect, read, write or flush.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// The peer closed the connection.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A socket operation or the enquire_link exchange exceeded
    /// socket_timeout.
    #[error("operation timed out")]
    Timeout,

    /// No response arrived for a request before its TTL; reported to the
    /// application through the send_error hook.
    #[error("no response to request received within {0:?}")]
    ResponseTimeout(Duration),

    /// A message failed validation before it reached the wire.
    #[error("validation error: {0}")]
    Validation(String),

    /// The persistent correlation store could not commit a write.
    #[error("correlation storage error: {0}")]
    Storage(String),

    /// Cooperative shutdown in progress.
    #[error("session is shutting down")]
    Shutdown,
}

pub type EsmeResult<T> = Result<T, EsmeError>;

impl EsmeError {
    /// Per-message errors of this kind end the session (the supervisor
    /// reconnects); the rest are reported to the application and the send
    /// loop continues.
    pub fn is_fatal(&self) -> bool {
        match self {
            EsmeError::Connection(_)
            | EsmeError::ConnectionClosed
            | EsmeError::Timeout
            | EsmeError::Storage(_)
            | EsmeError::Shutdown
            | EsmeError::Protocol { .. } => true,
            EsmeError::Codec(_)
            | EsmeError::Validation(_)
            | EsmeError::ResponseTimeout(_) => false,
        }
    }
}
