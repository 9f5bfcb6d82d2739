// deliver_sm and deliver_sm_resp (SMPP v3.4 sections 4.6.1-4.6.2).
//
// The body is identical to submit_sm; what is special here is delivery
// receipt recognition and the de-facto receipt text format, which is
// SMSC-specific and parsed tolerantly.

use crate::datatypes::{CommandId, CommandStatus, ESM_UDHI, PhoneNumber, SmppTime};
use crate::datatypes::tlv::{OptionalParam, OptionalTag};
use crate::encoding::{ConcatInfo, ErrorHandling};
use crate::macros::{impl_message_id_resp_pdu, impl_sms_pdu};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliverSm {
    pub sequence_number: u32,

    /// Tracking metadata resolved from the originating submit when this is
    /// a delivery receipt (never on the wire).
    pub log_id: String,
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
    pub encoding: Option<String>,
    pub sm_default_msg_id: u8,
    pub message_payload: String,
    pub optional_params: Vec<OptionalParam>,
    pub auto_message_payload: bool,
    pub error_handling: ErrorHandling,
    pub concat: Option<ConcatInfo>,
}

impl Default for DeliverSm {
    fn default() -> Self {
        DeliverSm {
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

impl_sms_pdu!(DeliverSm, CommandId::DeliverSm);

impl DeliverSm {
    /// A deliver_sm is a delivery receipt when the middle four bits of
    /// esm_class equal 1.
    pub fn is_receipt(&self) -> bool {
        (self.esm_class & 0b0011_1100) >> 2 == 1
    }

    /// True if this part belongs to a concatenated message (UDHI set and a
    /// concatenation UDH present).
    pub fn is_segment(&self) -> bool {
        self.esm_class & ESM_UDHI != 0 && self.concat.is_some()
    }

    /// Parses the receipt text. Returns `None` when this message is not
    /// flagged as a receipt. Unknown keys are kept verbatim in `extra`;
    /// a missing `id` falls back to the receipted_message_id TLV.
    pub fn receipt(&self) -> Option<DeliveryReceipt> {
        if !self.is_receipt() {
            return None;
        }
        let mut receipt = DeliveryReceipt::parse(&self.short_message);
        if receipt.message_id.is_none() {
            receipt.message_id = self
                .optional_params
                .iter()
                .find(|param| param.tag() == OptionalTag::ReceiptedMessageId)
                .and_then(|param| param.value().as_text())
                .map(str::to_owned);
        }
        Some(receipt)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverSmResp {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub message_id: String,
    pub log_id: String,
    pub extra_data: String,
}

impl_message_id_resp_pdu!(DeliverSmResp, CommandId::DeliverSmResp);

/// Fields of the de-facto delivery receipt text:
/// `id:... sub:... dlvrd:... submit date:... done date:... stat:... err:... text:...`.
///
/// Every field is optional; dates are kept in their raw `YYMMDDHHMM` form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
    pub submitted: Option<u32>,
    pub delivered: Option<u32>,
    pub submit_date: Option<String>,
    pub done_date: Option<String>,
    pub stat: Option<String>,
    pub err: Option<String>,
    pub text: Option<String>,
    /// Keys this parser does not recognise, kept as opaque strings.
    pub extra: BTreeMap<String, String>,
}

impl DeliveryReceipt {
    /// Tolerant key:value parser. Keys are case-folded and may contain
    /// spaces (`submit date`); values run to the next space except for
    /// `text`, which runs to the end of the message.
    pub fn parse(input: &str) -> DeliveryReceipt {
        let mut receipt = DeliveryReceipt::default();
        let mut index = 0usize;
        while let Some(colon) = input[index..].find(':') {
            let key = input[index..index + colon].trim().to_ascii_lowercase();
            index += colon + 1;
            let value_end = match input[index..].find(' ') {
                // Text must be the last field.
                Some(_) if key == "text" => input.len(),
                Some(space) => index + space,
                None => input.len(),
            };
            let value = &input[index..value_end];
            index = (value_end + 1).min(input.len());

            match key.as_str() {
                "id" => receipt.message_id = Some(value.to_owned()),
                "sub" => match value.parse() {
                    Ok(count) => receipt.submitted = Some(count),
                    Err(_) => {
                        receipt.extra.insert(key, value.to_owned());
                    }
                },
                "dlvrd" => match value.parse() {
                    Ok(count) => receipt.delivered = Some(count),
                    Err(_) => {
                        receipt.extra.insert(key, value.to_owned());
                    }
                },
                "submit date" => receipt.submit_date = Some(value.to_owned()),
                "done date" => receipt.done_date = Some(value.to_owned()),
                "stat" => receipt.stat = Some(value.to_owned()),
                "err" => receipt.err = Some(value.to_owned()),
                "text" => receipt.text = Some(value.to_owned()),
                _ => {
                    receipt.extra.insert(key, value.to_owned());
                }
            }
        }
        receipt
    }

    /// Renders the receipt in the usual format. The text field is padded to
    /// 20 characters as most SMSCs do.
    pub fn encode(&self) -> String {
        format!(
            "id:{} sub:{:03} dlvrd:{:03} submit date:{} done date:{} stat:{} err:{} Text:{:<20}",
            self.message_id.as_deref().unwrap_or(""),
            self.submitted.unwrap_or(0),
            self.delivered.unwrap_or(0),
            self.submit_date.as_deref().unwrap_or(""),
            self.done_date.as_deref().unwrap_or(""),
            self.stat.as_deref().unwrap_or(""),
            self.err.as_deref().unwrap_or(""),
            self.text.as_deref().unwrap_or(""),
        )
    }

    /// The receipt reports final delivery (`stat:DELIVRD`).
    pub fn is_delivered(&self) -> bool {
        self.stat.as_deref() == Some("DELIVRD")
    }
}
