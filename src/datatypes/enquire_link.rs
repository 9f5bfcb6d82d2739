// enquire_link and enquire_link_resp (SMPP v3.4 section 4.11): the
// keep-alive exchange. Header only, no body.

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquireLink {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquireLinkResp {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_header_only_pdu!(EnquireLinkResp, CommandId::EnquireLinkResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn enquire_link_wire_image() {
        let pdu = EnquireLink::new(7).to_bytes().unwrap();
        assert_eq!(
            pdu.as_ref(),
            &[
                0x00, 0x00, 0x00, 0x10, // length
                0x00, 0x00, 0x00, 0x15, // enquire_link
                0x00, 0x00, 0x00, 0x00, // status
                0x00, 0x00, 0x00, 0x07, // sequence
            ]
        );
    }

    #[test]
    fn roundtrip() {
        let original = EnquireLinkResp::new(42);
        let pdu = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(pdu.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = EnquireLinkResp::decode(&header, &mut cursor).unwrap();
        assert_eq!(decoded, original);
    }
}
