// Macros cutting the boilerplate shared by PDU implementations: header-only
// PDUs, the message_id response pair, and the common submit_sm/deliver_sm
// body codec (identical bodies, different command ids).

/// Implements `Encodable`, `Decodable` and the `new`/`error` constructors
/// for a PDU that consists of the 16-byte header only.
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            pub fn error(
                sequence_number: u32,
                status: $crate::datatypes::CommandStatus,
            ) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                let header = $crate::codec::PduHeader {
                    command_length: $crate::codec::PduHeader::SIZE as u32,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf);
                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: &$crate::codec::PduHeader,
                _buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                Self::validate_header(header)?;
                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }
    };
}

/// Implements the codec for submit_sm_resp/deliver_sm_resp: a header plus a
/// single message_id C-octet string (possibly absent on error responses).
macro_rules! impl_message_id_resp_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id: message_id.into(),
                    log_id: String::new(),
                    extra_data: String::new(),
                }
            }

            pub fn error(
                sequence_number: u32,
                status: $crate::datatypes::CommandStatus,
            ) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    message_id: String::new(),
                    log_id: String::new(),
                    extra_data: String::new(),
                }
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                if self.message_id.len() > 64 {
                    return Err($crate::codec::field_error(
                        "message_id",
                        "maximum length is 64",
                    ));
                }
                let header = $crate::codec::PduHeader {
                    command_length: 0,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                };
                header.encode(buf);
                $crate::codec::encode_cstring(buf, &self.message_id);
                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: &$crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(header)?;
                // Error responses may omit the message_id entirely.
                let message_id = if buf.has_remaining() {
                    $crate::codec::decode_cstring(buf, 65, "message_id")?
                } else {
                    String::new()
                };
                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                    log_id: String::new(),
                    extra_data: String::new(),
                })
            }
        }
    };
}

/// Implements the shared short-message body codec for submit_sm and
/// deliver_sm, including text encoding with UCS-2 fallback, the automatic
/// message_payload spill, concatenation UDH handling and optional
/// parameters.
macro_rules! impl_sms_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            /// Checks the invariants that must hold before a send.
            pub fn validate(&self) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::field_error;

                if self.short_message.is_empty() && self.message_payload.is_empty() {
                    return Err(field_error(
                        "short_message",
                        "either short_message or message_payload must be specified",
                    ));
                }
                if !self.short_message.is_empty() && !self.message_payload.is_empty() {
                    return Err(field_error(
                        "short_message",
                        "specifying both short_message and message_payload is not allowed",
                    ));
                }
                if self.service_type.len() > 5 {
                    return Err(field_error("service_type", "maximum length is 5"));
                }
                if self.destination.number.is_empty() {
                    return Err(field_error("destination_addr", "destination is empty"));
                }
                Ok(())
            }

            /// Encodes the message text with the configured or default
            /// encoding. When no encoding is pinned and the default cannot
            /// represent the text, falls back to UCS-2 and records that
            /// choice on the message.
            fn encode_text(
                &mut self,
                text: &str,
                cfg: &$crate::encoding::EncodingConfig,
            ) -> Result<Vec<u8>, $crate::codec::CodecError> {
                use $crate::encoding::TextError;

                let encoded = match &self.encoding {
                    Some(encoding) => cfg.registry.encode(encoding, text, self.error_handling)?,
                    None => match cfg
                        .registry
                        .encode(&cfg.default_encoding, text, self.error_handling)
                    {
                        Ok(encoded) => encoded,
                        Err(TextError::Unencodable { .. }) => {
                            let encoded = cfg.registry.encode("ucs2", text, self.error_handling)?;
                            self.encoding = Some("ucs2".to_owned());
                            encoded
                        }
                        Err(other) => return Err(other.into()),
                    },
                };
                Ok(encoded)
            }

            /// Encodes the full PDU. Takes `&mut self` because the automatic
            /// UCS-2 fallback is recorded back onto the message.
            pub fn to_pdu(
                &mut self,
                cfg: &$crate::encoding::EncodingConfig,
            ) -> Result<bytes::Bytes, $crate::codec::CodecError> {
                use bytes::{BufMut, BytesMut};
                use $crate::codec::{encode_cstring, field_error};
                use $crate::datatypes::{DataCoding, OptionalTag};

                self.validate()?;

                let text = if !self.short_message.is_empty() {
                    self.short_message.clone()
                } else {
                    self.message_payload.clone()
                };
                let mut sm_bytes = self.encode_text(&text, cfg)?;

                let data_coding = match &self.encoding {
                    Some(encoding) => DataCoding::from_encoding_name(encoding) as u8,
                    None => 0, // SMSC default alphabet
                };

                if let Some(concat) = self.concat {
                    let mut with_udh = concat.to_udh();
                    with_udh.extend_from_slice(&sm_bytes);
                    sm_bytes = with_udh;
                }

                let mut payload: Option<Vec<u8>> = None;
                if sm_bytes.len() > 254 {
                    if !self.short_message.is_empty() && !self.auto_message_payload {
                        return Err(field_error(
                            "short_message",
                            format!(
                                "message is too long ({} bytes, maximum is 254)",
                                sm_bytes.len()
                            ),
                        ));
                    }
                    payload = Some(std::mem::take(&mut sm_bytes));
                } else if !self.message_payload.is_empty() {
                    payload = Some(std::mem::take(&mut sm_bytes));
                }

                let esm_class = if self.concat.is_some() {
                    self.esm_class | $crate::datatypes::ESM_UDHI
                } else {
                    self.esm_class
                };

                let mut buf = BytesMut::new();
                let header = $crate::codec::PduHeader {
                    command_length: 0,
                    command_id: $command_id,
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number: self.sequence_number,
                };
                header.encode(&mut buf);

                encode_cstring(&mut buf, &self.service_type);
                buf.put_u8(self.source.ton as u8);
                buf.put_u8(self.source.npi as u8);
                encode_cstring(&mut buf, &self.source.number);
                buf.put_u8(self.destination.ton as u8);
                buf.put_u8(self.destination.npi as u8);
                encode_cstring(&mut buf, &self.destination.number);
                buf.put_u8(esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                let schedule = $crate::datatypes::time_to_wire(&self.schedule_delivery_time)
                    .map_err(|err| field_error("schedule_delivery_time", err.to_string()))?;
                encode_cstring(&mut buf, &schedule);
                let validity = $crate::datatypes::time_to_wire(&self.validity_period)
                    .map_err(|err| field_error("validity_period", err.to_string()))?;
                encode_cstring(&mut buf, &validity);
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(data_coding);
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(sm_bytes.len() as u8);
                buf.put_slice(&sm_bytes);

                if let Some(payload) = payload {
                    buf.put_u16(OptionalTag::MessagePayload as u16);
                    buf.put_u16(payload.len() as u16);
                    buf.put_slice(&payload);
                }
                for param in &self.optional_params {
                    param.encode(&mut buf);
                }

                let length = buf.len() as u32;
                buf[0..4].copy_from_slice(&length.to_be_bytes());
                Ok(buf.freeze())
            }

            /// Decodes the PDU body. The cursor must hold exactly this PDU's
            /// body bytes behind the header.
            pub fn decode(
                header: &$crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
                cfg: &$crate::encoding::EncodingConfig,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;
                use $crate::codec::{
                    CodecError, decode_cstring, decode_u8, decode_u16, field_error,
                };
                use $crate::datatypes::{
                    DataCoding, Npi, OptionalParam, OptionalTag, PhoneNumber, SmppTime, Ton,
                };
                use $crate::encoding::ErrorHandling;

                if header.command_id != $command_id {
                    return Err(CodecError::UnexpectedCommandId {
                        expected: $command_id,
                        actual: header.command_id,
                    });
                }

                let service_type = decode_cstring(buf, 6, "service_type")?;
                let source_ton = Ton::try_from(decode_u8(buf)?)
                    .map_err(|err| field_error("source_addr_ton", err.to_string()))?;
                let source_npi = Npi::try_from(decode_u8(buf)?)
                    .map_err(|err| field_error("source_addr_npi", err.to_string()))?;
                let source_number = decode_cstring(buf, 21, "source_addr")?;
                let dest_ton = Ton::try_from(decode_u8(buf)?)
                    .map_err(|err| field_error("dest_addr_ton", err.to_string()))?;
                let dest_npi = Npi::try_from(decode_u8(buf)?)
                    .map_err(|err| field_error("dest_addr_npi", err.to_string()))?;
                let dest_number = decode_cstring(buf, 21, "destination_addr")?;
                let esm_class = decode_u8(buf)?;
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_raw = decode_cstring(buf, 17, "schedule_delivery_time")?;
                let schedule_delivery_time = SmppTime::parse(&schedule_raw)
                    .map_err(|err| field_error("schedule_delivery_time", err.to_string()))?;
                let validity_raw = decode_cstring(buf, 17, "validity_period")?;
                let validity_period = SmppTime::parse(&validity_raw)
                    .map_err(|err| field_error("validity_period", err.to_string()))?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = decode_u8(buf)?;
                let encoding_name = if data_coding == 0 {
                    cfg.default_encoding.clone()
                } else {
                    DataCoding::try_from(data_coding)
                        .ok()
                        .and_then(|coding| coding.encoding_name())
                        .ok_or_else(|| {
                            field_error(
                                "data_coding",
                                format!("unsupported data_coding {data_coding:#04x}"),
                            )
                        })?
                        .to_owned()
                };
                let codec = cfg.registry.lookup(&encoding_name)?;
                let sm_default_msg_id = decode_u8(buf)?;
                let sm_length = decode_u8(buf)? as usize;
                if sm_length > 254 {
                    return Err(field_error(
                        "short_message",
                        format!("sm_length {sm_length} exceeds maximum of 254"),
                    ));
                }
                if buf.remaining() < sm_length {
                    return Err(CodecError::Incomplete);
                }
                let mut raw = vec![0u8; sm_length];
                buf.copy_to_slice(&mut raw);

                let mut concat = None;
                let mut text_bytes = raw.as_slice();
                if esm_class & $crate::datatypes::ESM_UDHI != 0 && !raw.is_empty() {
                    let (info, offset) = $crate::encoding::parse_udh(&raw)
                        .ok_or_else(|| field_error("short_message", "malformed UDH"))?;
                    concat = info;
                    text_bytes = &raw[offset..];
                }
                let short_message = codec.decode(text_bytes, ErrorHandling::Strict)?;

                let mut message_payload = String::new();
                let mut optional_params = Vec::new();
                while buf.has_remaining() {
                    let tag_raw = decode_u16(buf)?;
                    let length = decode_u16(buf)?;
                    match OptionalTag::try_from(tag_raw) {
                        Ok(OptionalTag::MessagePayload) => {
                            if buf.remaining() < length as usize {
                                return Err(CodecError::Incomplete);
                            }
                            let mut payload = vec![0u8; length as usize];
                            buf.copy_to_slice(&mut payload);
                            message_payload = codec.decode(&payload, ErrorHandling::Strict)?;
                        }
                        Ok(tag) => {
                            optional_params.push(OptionalParam::decode_value(tag, length, buf)?);
                        }
                        Err(_) => {
                            if buf.remaining() < length as usize {
                                return Err(CodecError::Incomplete);
                            }
                            tracing::warn!(tag = format!("{tag_raw:#06x}"), "skipping unknown TLV");
                            buf.advance(length as usize);
                        }
                    }
                }

                Ok(Self {
                    sequence_number: header.sequence_number,
                    log_id: String::new(),
                    extra_data: String::new(),
                    short_message,
                    source: PhoneNumber {
                        number: source_number,
                        ton: source_ton,
                        npi: source_npi,
                    },
                    destination: PhoneNumber {
                        number: dest_number,
                        ton: dest_ton,
                        npi: dest_npi,
                    },
                    service_type,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    encoding: (data_coding != 0).then(|| encoding_name),
                    sm_default_msg_id,
                    message_payload,
                    optional_params,
                    auto_message_payload: true,
                    error_handling: ErrorHandling::Strict,
                    concat,
                })
            }
        }
    };
}

/// Generates fluent setters that assign a field and return `self`.
macro_rules! builder_setters {
    ($($(#[$doc:meta])* $field:ident: $type:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

pub(crate) use {
    builder_setters, impl_header_only_pdu, impl_message_id_resp_pdu, impl_sms_pdu,
};
