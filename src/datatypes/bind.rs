// Bind operations (SMPP v3.4 sections 4.1.x): the three bind requests share
// one body layout and differ only in command id, so a single mode-tagged
// struct covers them, and likewise for the responses.

use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, decode_cstring, decode_u8, encode_cstring,
    field_error,
};
use crate::datatypes::{CommandId, CommandStatus, Npi, Ton};
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// The interface_version this client speaks.
pub const SMPP_VERSION_3_4: u8 = 0x34;

pub const MAX_SYSTEM_ID_LENGTH: usize = 15;
pub const MAX_PASSWORD_LENGTH: usize = 8;
pub const MAX_SYSTEM_TYPE_LENGTH: usize = 12;
pub const MAX_ADDRESS_RANGE_LENGTH: usize = 40;

/// The role a session binds into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindMode {
    Transmitter,
    Receiver,
    #[default]
    Transceiver,
}

impl BindMode {
    pub fn command_id(self) -> CommandId {
        match self {
            BindMode::Transmitter => CommandId::BindTransmitter,
            BindMode::Receiver => CommandId::BindReceiver,
            BindMode::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_id(self) -> CommandId {
        match self {
            BindMode::Transmitter => CommandId::BindTransmitterResp,
            BindMode::Receiver => CommandId::BindReceiverResp,
            BindMode::Transceiver => CommandId::BindTransceiverResp,
        }
    }

    fn from_command_id(command_id: CommandId) -> Option<BindMode> {
        match command_id {
            CommandId::BindTransmitter => Some(BindMode::Transmitter),
            CommandId::BindReceiver => Some(BindMode::Receiver),
            CommandId::BindTransceiver => Some(BindMode::Transceiver),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BindMode::Transmitter => "transmitter",
            BindMode::Receiver => "receiver",
            BindMode::Transceiver => "transceiver",
        }
    }
}

/// bind_transmitter / bind_receiver / bind_transceiver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    pub sequence_number: u32,
    pub mode: BindMode,
    pub system_id: String,
    pub password: String,
    pub system_type: String,
    pub interface_version: u8,
    pub addr_ton: Ton,
    pub addr_npi: Npi,
    pub address_range: String,
}

impl Default for BindRequest {
    fn default() -> Self {
        BindRequest {
            sequence_number: 0,
            mode: BindMode::Transceiver,
            system_id: String::new(),
            password: String::new(),
            system_type: String::new(),
            interface_version: SMPP_VERSION_3_4,
            addr_ton: Ton::Unknown,
            addr_npi: Npi::Unknown,
            address_range: String::new(),
        }
    }
}

impl BindRequest {
    pub fn command_id(&self) -> CommandId {
        self.mode.command_id()
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.system_id.len() > MAX_SYSTEM_ID_LENGTH {
            return Err(field_error("system_id", "maximum length is 15"));
        }
        if self.password.len() > MAX_PASSWORD_LENGTH {
            return Err(field_error("password", "maximum length is 8"));
        }
        if self.system_type.len() > MAX_SYSTEM_TYPE_LENGTH {
            return Err(field_error("system_type", "maximum length is 12"));
        }
        if self.address_range.len() > MAX_ADDRESS_RANGE_LENGTH {
            return Err(field_error("address_range", "maximum length is 40"));
        }
        Ok(())
    }

    /// Decodes any of the three bind request variants; the mode comes from
    /// the header's command id.
    pub fn decode(header: &PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let mode = BindMode::from_command_id(header.command_id).ok_or(
            CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiver,
                actual: header.command_id,
            },
        )?;
        let system_id = decode_cstring(buf, 16, "system_id")?;
        let password = decode_cstring(buf, 9, "password")?;
        let system_type = decode_cstring(buf, 13, "system_type")?;
        let interface_version = decode_u8(buf)?;
        let addr_ton = Ton::try_from(decode_u8(buf)?)
            .map_err(|err| field_error("addr_ton", err.to_string()))?;
        let addr_npi = Npi::try_from(decode_u8(buf)?)
            .map_err(|err| field_error("addr_npi", err.to_string()))?;
        let address_range = decode_cstring(buf, 41, "address_range")?;

        Ok(BindRequest {
            sequence_number: header.sequence_number,
            mode,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

impl Encodable for BindRequest {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        self.validate()?;
        let header = PduHeader {
            command_length: 0,
            command_id: self.command_id(),
            command_status: CommandStatus::Ok,
            sequence_number: self.sequence_number,
        };
        header.encode(buf);
        encode_cstring(buf, &self.system_id);
        encode_cstring(buf, &self.password);
        encode_cstring(buf, &self.system_type);
        buf.put_u8(self.interface_version);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(buf, &self.address_range);
        Ok(())
    }
}

/// bind_*_resp. The optional sc_interface_version TLV is the only optional
/// parameter a bind response may carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindResponse {
    pub command: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub sc_interface_version: Option<u8>,
}

impl BindResponse {
    pub fn new(mode: BindMode, sequence_number: u32, system_id: impl Into<String>) -> Self {
        BindResponse {
            command: mode.response_id(),
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.into(),
            sc_interface_version: None,
        }
    }

    pub fn decode(header: &PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if !matches!(
            header.command_id,
            CommandId::BindTransmitterResp
                | CommandId::BindReceiverResp
                | CommandId::BindTransceiverResp
        ) {
            return Err(CodecError::UnexpectedCommandId {
                expected: CommandId::BindTransceiverResp,
                actual: header.command_id,
            });
        }
        // Failed binds may come back with an empty body.
        let system_id = if buf.has_remaining() {
            decode_cstring(buf, 16, "system_id")?
        } else {
            String::new()
        };
        let mut sc_interface_version = None;
        if buf.remaining() >= 5 {
            let tag = buf.get_u16();
            let length = buf.get_u16();
            if tag == 0x0210 && length == 1 {
                sc_interface_version = Some(buf.get_u8());
            } else if buf.remaining() >= length as usize {
                buf.advance(length as usize);
            }
        }
        Ok(BindResponse {
            command: header.command_id,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            sc_interface_version,
        })
    }
}

impl Encodable for BindResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let header = PduHeader {
            command_length: 0,
            command_id: self.command,
            command_status: self.command_status,
            sequence_number: self.sequence_number,
        };
        header.encode(buf);
        encode_cstring(buf, &self.system_id);
        if let Some(version) = self.sc_interface_version {
            buf.put_u16(0x0210);
            buf.put_u16(1);
            buf.put_u8(version);
        }
        Ok(())
    }
}

// Decodable is only implemented for the transceiver flavour; the mixed-mode
// decode entry points above are what frame.rs dispatches through.
impl Decodable for BindRequest {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: &PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        BindRequest::decode(header, buf)
    }
}
