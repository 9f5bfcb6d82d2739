// generic_nack (SMPP v3.4 section 4.3.1): the error response for PDUs that
// cannot be answered with a typed response, e.g. unparseable requests.

use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericNack {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn nack_carries_error_status() {
        let original = GenericNack::error(5, CommandStatus::InvalidCommandId);
        let pdu = original.to_bytes().unwrap();
        let mut cursor = Cursor::new(pdu.as_ref());
        let header = PduHeader::decode(&mut cursor).unwrap();
        let decoded = GenericNack::decode(&header, &mut cursor).unwrap();
        assert_eq!(decoded.command_status, CommandStatus::InvalidCommandId);
    }
}
