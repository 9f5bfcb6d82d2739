// submit_sm and submit_sm_resp (SMPP v3.4 sections 4.4.1-4.4.2).
//
// An ESME submits a short message to the SMSC for onward transmission. The
// in-memory struct carries application tracking metadata (log_id,
// extra_data) and encoding preferences that never appear on the wire.

use crate::datatypes::{CommandId, CommandStatus, PhoneNumber, SmppTime};
use crate::datatypes::tlv::OptionalParam;
use crate::encoding::{ConcatInfo, ErrorHandling};
use crate::macros::{impl_message_id_resp_pdu, impl_sms_pdu};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmitSm {
    pub sequence_number: u32,

    /// Application-supplied tracking id. Never on the wire; copied onto the
    /// response and the eventual delivery receipt.
    pub log_id: String,
    /// Application-supplied opaque metadata, carried like `log_id`.
    pub extra_data: String,

    pub short_message: String,
    pub source: PhoneNumber,
    pub destination: PhoneNumber,
    pub service_type: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: Option<SmppTime>,
    pub validity_period: Option<SmppTime>,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    /// Pinned encoding name, or `None` to try the session default and fall
    /// back to UCS-2 (the fallback is recorded here by `to_pdu`).
    pub encoding: Option<String>,
    pub sm_default_msg_id: u8,
    /// Alternative to `short_message` for texts over 254 encoded bytes,
    /// emitted as the message_payload TLV.
    pub message_payload: String,
    pub optional_params: Vec<OptionalParam>,
    /// Spill an over-long short_message into message_payload instead of
    /// failing the build.
    pub auto_message_payload: bool,
    pub error_handling: ErrorHandling,
    /// Concatenation descriptor for one part of a multipart message;
    /// rendered as a UDH in front of the text.
    pub concat: Option<ConcatInfo>,
}

impl Default for SubmitSm {
    fn default() -> Self {
        SubmitSm {
            sequence_number: 0,
            log_id: String::new(),
            extra_data: String::new(),
            short_message: String::new(),
            source: PhoneNumber::default(),
            destination: PhoneNumber::default(),
            service_type: String::new(),
            esm_class: 0x00,
            protocol_id: 0x00,
            priority_flag: 0x00,
            schedule_delivery_time: None,
            validity_period: None,
            registered_delivery: 0b0000_0001,
            replace_if_present_flag: 0x00,
            encoding: None,
            sm_default_msg_id: 0x00,
            message_payload: String::new(),
            optional_params: Vec::new(),
            auto_message_payload: true,
            error_handling: ErrorHandling::Strict,
            concat: None,
        }
    }
}

impl SubmitSm {
    pub fn new(
        short_message: impl Into<String>,
        source: PhoneNumber,
        destination: PhoneNumber,
    ) -> Self {
        SubmitSm {
            short_message: short_message.into(),
            source,
            destination,
            ..SubmitSm::default()
        }
    }
}

impl_sms_pdu!(SubmitSm, CommandId::SubmitSm);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSmResp {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// SMSC-issued message id, the key for delivery-receipt correlation.
    pub message_id: String,

    /// Tracking metadata copied from the originating submit (never on the
    /// wire).
    pub log_id: String,
    pub extra_data: String,
}

impl_message_id_resp_pdu!(SubmitSmResp, CommandId::SubmitSmResp);
