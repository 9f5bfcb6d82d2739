// SMPP v3.4 wire codec - header handling and field primitives shared by all PDUs.
//
// Each PDU implements the Encodable/Decodable traits defined here rather than
// routing through a monolithic parser; frame.rs dispatches on command_id.

use crate::datatypes::{CommandId, CommandStatus};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum allowed PDU size. The message_payload parameter can carry up to
/// 64 KiB; a little headroom is added on top of that.
pub const MAX_PDU_SIZE: u32 = 65536 + 1024;

pub const MIN_SEQUENCE_NUMBER: u32 = 0x0000_0001;
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// SMPP v3.4 PDU header (16 bytes, big-endian, common to all PDUs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode and validate a PDU header from the buffer.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let command_status_raw = buf.get_u32();
        let command_status = CommandStatus::try_from(command_status_raw)
            .map_err(|_| CodecError::InvalidCommandStatus(command_status_raw))?;
        let sequence_number = buf.get_u32();

        if command_length < Self::SIZE as u32 || command_length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode the header. `command_length` is written as-is; `Encodable::to_bytes`
    /// fixes it up once the body size is known.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status as u32);
        buf.put_u32(self.sequence_number);
    }
}

/// Trait for PDUs that can be encoded to wire bytes.
pub trait Encodable {
    /// Encode header and body into the buffer. The command_length field may be
    /// written as a placeholder; `to_bytes` patches it.
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encode to a frozen byte buffer with a correct command_length field.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Trait for PDUs that can be decoded from wire bytes.
pub trait Decodable: Sized {
    /// The command_id this PDU type answers to.
    fn command_id() -> CommandId;

    /// Decode the PDU body. The cursor is positioned just past the header;
    /// exactly `header.command_length - 16` bytes of body are available.
    fn decode(header: &PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Wire-level codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("incomplete PDU: need more data")]
    Incomplete,

    #[error("invalid command_id: {0:#010x}")]
    InvalidCommandId(u32),

    #[error("invalid command_status: {0:#010x}")]
    InvalidCommandStatus(u32),

    #[error("invalid PDU length {length}, must be within {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("field `{field}`: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("malformed TLV: {0}")]
    Tlv(String),

    #[error("text codec error: {0}")]
    Text(#[from] crate::encoding::TextError),
}

impl CodecError {
    /// The command_status to report back in a generic_nack for this error.
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            _ => CommandStatus::SystemError,
        }
    }
}

pub(crate) fn field_error(field: &'static str, reason: impl Into<String>) -> CodecError {
    CodecError::FieldValidation {
        field,
        reason: reason.into(),
    }
}

/// Read a NUL-terminated C-octet string of at most `max_len` bytes
/// (terminator included). The terminator is consumed but not returned.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let window = chunk.len().min(max_len);
    let end = chunk[..window]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| field_error(field, "missing NUL terminator"))?;

    let value = std::str::from_utf8(&chunk[..end])
        .map_err(|_| field_error(field, "not valid ASCII/UTF-8"))?
        .to_owned();
    buf.advance(end + 1);
    Ok(value)
}

/// Write a C-octet string: the bytes followed by a NUL terminator.
pub fn encode_cstring(buf: &mut BytesMut, value: &str) {
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
}

pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if !buf.has_remaining() {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

pub fn decode_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u32())
}

/// Peek the next 4 bytes without advancing (used for command_length framing).
pub fn peek_u32(buf: &mut Cursor<&[u8]>) -> Result<u32, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    let pos = buf.position();
    let value = buf.get_u32();
    buf.set_position(pos);
    Ok(value)
}
