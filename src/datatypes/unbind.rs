// unbind and unbind_resp (SMPP v3.4 section 4.2). Header only.

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unbind {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindResp {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(Unbind, CommandId::Unbind);
impl_header_only_pdu!(UnbindResp, CommandId::UnbindResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let original = Unbind::new(123);
        let pdu = original.to_bytes().unwrap();
        assert_eq!(pdu.len(), 16);
        let mut cursor = Cursor::new(pdu.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = Unbind::decode(&header, &mut cursor).unwrap();
        assert_eq!(decoded, original);
    }
}
