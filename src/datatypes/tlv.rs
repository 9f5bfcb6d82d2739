// Optional parameters (SMPP v3.4 section 5.3.2), encoded as TLVs after the
// mandatory body. Every known tag has a fixed value shape; the pair is
// validated at construction so a malformed parameter cannot exist.

use crate::codec::{CodecError, decode_u8, decode_u16, decode_u32};
use bytes::{Buf, BufMut, BytesMut};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Optional parameter tags from the SMPP v3.4 register.
///
/// `MessagePayload` is recognised here so the decoder can route it, but an
/// `OptionalParam` carrying it cannot be constructed: the payload text lives
/// in the message's `message_payload` field and is encoded with the same
/// text codec as `short_message`.
#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionalTag {
    DestAddrSubunit = 0x0005,
    DestNetworkType = 0x0006,
    DestBearerType = 0x0007,
    DestTelematicsId = 0x0008,
    SourceAddrSubunit = 0x000D,
    SourceNetworkType = 0x000E,
    SourceBearerType = 0x000F,
    SourceTelematicsId = 0x0010,
    QosTimeToLive = 0x0017,
    PayloadType = 0x0019,
    AdditionalStatusInfoText = 0x001D,
    ReceiptedMessageId = 0x001E,
    MsMsgWaitFacilities = 0x0030,
    PrivacyIndicator = 0x0201,
    SourceSubaddress = 0x0202,
    DestSubaddress = 0x0203,
    UserMessageReference = 0x0204,
    UserResponseCode = 0x0205,
    SourcePort = 0x020A,
    DestinationPort = 0x020B,
    SarMsgRefNum = 0x020C,
    LanguageIndicator = 0x020D,
    SarTotalSegments = 0x020E,
    SarSegmentSeqnum = 0x020F,
    ScInterfaceVersion = 0x0210,
    CallbackNumPresInd = 0x0302,
    CallbackNumAtag = 0x0303,
    NumberOfMessages = 0x0304,
    CallbackNum = 0x0381,
    DpfResult = 0x0420,
    SetDpf = 0x0421,
    MsAvailabilityStatus = 0x0422,
    NetworkErrorCode = 0x0423,
    MessagePayload = 0x0424,
    DeliveryFailureReason = 0x0425,
    MoreMessagesToSend = 0x0426,
    MessageState = 0x0427,
    UssdServiceOp = 0x0501,
    DisplayTime = 0x1201,
    SmsSignal = 0x1203,
    MsValidity = 0x1204,
    AlertOnMessageDelivery = 0x130C,
    ItsReplyType = 0x1380,
    ItsSessionInfo = 0x1383,
}

/// The wire shape of a tag's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    U8,
    U16,
    U32,
    /// ASCII, NUL-terminated on the wire.
    CString,
    /// ASCII, no terminator.
    Octets,
    /// Zero-length flag; presence is the value.
    Flag,
}

impl OptionalTag {
    pub fn value_kind(self) -> ValueKind {
        use OptionalTag::*;
        match self {
            AdditionalStatusInfoText | ReceiptedMessageId => ValueKind::CString,
            SourceSubaddress | DestSubaddress | CallbackNumAtag | CallbackNum
            | NetworkErrorCode | UssdServiceOp | ItsSessionInfo | MessagePayload => {
                ValueKind::Octets
            }
            DestTelematicsId | UserMessageReference | SourcePort | DestinationPort
            | SarMsgRefNum | SmsSignal => ValueKind::U16,
            QosTimeToLive => ValueKind::U32,
            AlertOnMessageDelivery => ValueKind::Flag,
            _ => ValueKind::U8,
        }
    }
}

/// A typed optional parameter value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionalValue {
    U8(u8),
    U16(u16),
    U32(u32),
    /// Used for both C-octet and plain octet strings; the tag decides
    /// whether a NUL terminator goes on the wire.
    Text(String),
    /// Zero-length flag parameter.
    Flag,
}

impl OptionalValue {
    fn kind(&self) -> ValueKind {
        match self {
            OptionalValue::U8(_) => ValueKind::U8,
            OptionalValue::U16(_) => ValueKind::U16,
            OptionalValue::U32(_) => ValueKind::U32,
            OptionalValue::Text(_) => ValueKind::Octets,
            OptionalValue::Flag => ValueKind::Flag,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionalValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A validated (tag, value) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalParam {
    tag: OptionalTag,
    value: OptionalValue,
}

impl OptionalParam {
    /// Builds a parameter, rejecting tag/value shape mismatches and the
    /// reserved `message_payload` tag.
    pub fn new(tag: OptionalTag, value: OptionalValue) -> Result<Self, CodecError> {
        if tag == OptionalTag::MessagePayload {
            return Err(CodecError::Tlv(
                "message_payload cannot be an optional parameter; \
                 use the message_payload field on the message"
                    .into(),
            ));
        }
        let expected = tag.value_kind();
        let matches = match (expected, value.kind()) {
            (ValueKind::CString, ValueKind::Octets) => true,
            (expected, actual) => expected == actual,
        };
        if !matches {
            return Err(CodecError::Tlv(format!(
                "tag {tag:?} expects {expected:?} value"
            )));
        }
        Ok(OptionalParam { tag, value })
    }

    pub fn tag(&self) -> OptionalTag {
        self.tag
    }

    pub fn value(&self) -> &OptionalValue {
        &self.value
    }

    /// Length of the value field in octets.
    fn value_length(&self) -> u16 {
        match &self.value {
            OptionalValue::U8(_) => 1,
            OptionalValue::U16(_) => 2,
            OptionalValue::U32(_) => 4,
            OptionalValue::Text(text) => {
                let nul = u16::from(self.tag.value_kind() == ValueKind::CString);
                text.len() as u16 + nul
            }
            OptionalValue::Flag => 0,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.tag as u16);
        buf.put_u16(self.value_length());
        match &self.value {
            OptionalValue::U8(v) => buf.put_u8(*v),
            OptionalValue::U16(v) => buf.put_u16(*v),
            OptionalValue::U32(v) => buf.put_u32(*v),
            OptionalValue::Text(text) => {
                buf.put_slice(text.as_bytes());
                if self.tag.value_kind() == ValueKind::CString {
                    buf.put_u8(0);
                }
            }
            OptionalValue::Flag => {}
        }
    }

    /// Decodes the value of a known tag whose tag and length fields have
    /// already been read.
    pub fn decode_value(
        tag: OptionalTag,
        length: u16,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Self, CodecError> {
        if buf.remaining() < length as usize {
            return Err(CodecError::Incomplete);
        }
        let value = match tag.value_kind() {
            ValueKind::U8 | ValueKind::U16 | ValueKind::U32 => match length {
                1 => OptionalValue::U8(decode_u8(buf)?),
                2 => OptionalValue::U16(decode_u16(buf)?),
                4 => OptionalValue::U32(decode_u32(buf)?),
                other => {
                    return Err(CodecError::Tlv(format!(
                        "tag {tag:?} has invalid integer length {other}"
                    )));
                }
            },
            ValueKind::Flag => {
                // Nominally zero-length; tolerate peers that send a value.
                buf.advance(length as usize);
                OptionalValue::Flag
            }
            ValueKind::CString | ValueKind::Octets => {
                let mut raw = vec![0u8; length as usize];
                buf.copy_to_slice(&mut raw);
                // Strings may or may not arrive NUL-terminated.
                if raw.last() == Some(&0) {
                    raw.pop();
                }
                let text = String::from_utf8(raw)
                    .map_err(|_| CodecError::Tlv(format!("tag {tag:?} value is not ASCII")))?;
                OptionalValue::Text(text)
            }
        };
        Ok(OptionalParam { tag, value })
    }
}
