// SMPP v3.4 command identifiers (specification Table 4-1), restricted to the
// set a bind-capable client exchanges. Response ids carry the high bit.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// SMPP v3.4 command identifier.
///
/// Bit 31 distinguishes requests (0) from responses (1); the remaining bits
/// identify the operation. Ids outside this enum are rejected at header
/// decode and answered with a generic_nack.
#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandId {
    GenericNack = 0x8000_0000,

    BindReceiver = 0x0000_0001,
    BindReceiverResp = 0x8000_0001,
    BindTransmitter = 0x0000_0002,
    BindTransmitterResp = 0x8000_0002,
    BindTransceiver = 0x0000_0009,
    BindTransceiverResp = 0x8000_0009,

    SubmitSm = 0x0000_0004,
    SubmitSmResp = 0x8000_0004,
    DeliverSm = 0x0000_0005,
    DeliverSmResp = 0x8000_0005,

    Unbind = 0x0000_0006,
    UnbindResp = 0x8000_0006,

    EnquireLink = 0x0000_0015,
    EnquireLinkResp = 0x8000_0015,
}

impl CommandId {
    /// True if this id names a response PDU (high bit set).
    pub fn is_response(self) -> bool {
        (self as u32) & 0x8000_0000 != 0
    }

    /// The response id answering this request, if it is a request.
    /// generic_nack has no request counterpart and requests none.
    pub fn response_id(self) -> Option<CommandId> {
        match self {
            CommandId::BindReceiver => Some(CommandId::BindReceiverResp),
            CommandId::BindTransmitter => Some(CommandId::BindTransmitterResp),
            CommandId::BindTransceiver => Some(CommandId::BindTransceiverResp),
            CommandId::SubmitSm => Some(CommandId::SubmitSmResp),
            CommandId::DeliverSm => Some(CommandId::DeliverSmResp),
            CommandId::Unbind => Some(CommandId::UnbindResp),
            CommandId::EnquireLink => Some(CommandId::EnquireLinkResp),
            _ => None,
        }
    }

    /// The request id this response answers. generic_nack correlates to any
    /// request, so it maps to `None` and is matched by sequence number alone.
    pub fn request_id(self) -> Option<CommandId> {
        match self {
            CommandId::BindReceiverResp => Some(CommandId::BindReceiver),
            CommandId::BindTransmitterResp => Some(CommandId::BindTransmitter),
            CommandId::BindTransceiverResp => Some(CommandId::BindTransceiver),
            CommandId::SubmitSmResp => Some(CommandId::SubmitSm),
            CommandId::DeliverSmResp => Some(CommandId::DeliverSm),
            CommandId::UnbindResp => Some(CommandId::Unbind),
            CommandId::EnquireLinkResp => Some(CommandId::EnquireLink),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_bit() {
        assert!(!CommandId::SubmitSm.is_response());
        assert!(CommandId::SubmitSmResp.is_response());
        assert!(CommandId::GenericNack.is_response());
    }

    #[test]
    fn request_response_pairing() {
        assert_eq!(
            CommandId::SubmitSm.response_id(),
            Some(CommandId::SubmitSmResp)
        );
        assert_eq!(
            CommandId::EnquireLinkResp.request_id(),
            Some(CommandId::EnquireLink)
        );
        assert_eq!(CommandId::GenericNack.request_id(), None);
        assert_eq!(CommandId::SubmitSmResp.response_id(), None);
    }

    #[test]
    fn unknown_id_rejected() {
        assert!(CommandId::try_from(0x0000_0003u32).is_err()); // query_sm unsupported
        assert!(CommandId::try_from(0xFFFF_FFFFu32).is_err());
    }
}
