//! The `Pdu` sum type over every SMPP message this client exchanges, with
//! parse-by-command-id and uniform header accessors.

use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::{
    BindRequest, BindResponse, CommandId, CommandStatus, DeliverSm, DeliverSmResp, EnquireLink,
    EnquireLinkResp, GenericNack, SubmitSm, SubmitSmResp, Unbind, UnbindResp,
};
use crate::encoding::EncodingConfig;
use bytes::Bytes;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Pdu {
    BindRequest(BindRequest),
    BindResponse(BindResponse),
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResp),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResp),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResp),
    Unbind(Unbind),
    UnbindResp(UnbindResp),
    GenericNack(GenericNack),
}

impl Pdu {
    /// Parses one complete PDU. `data` must hold exactly the bytes of one
    /// PDU (the connection layer frames on the command_length field).
    pub fn parse(data: &[u8], cfg: &EncodingConfig) -> Result<Pdu, CodecError> {
        let mut buf = Cursor::new(data);
        let header = PduHeader::decode(&mut buf)?;
        if data.len() < header.command_length as usize {
            return Err(CodecError::Incomplete);
        }

        let pdu = match header.command_id {
            CommandId::BindTransmitter | CommandId::BindReceiver | CommandId::BindTransceiver => {
                Pdu::BindRequest(BindRequest::decode(&header, &mut buf)?)
            }
            CommandId::BindTransmitterResp
            | CommandId::BindReceiverResp
            | CommandId::BindTransceiverResp => {
                Pdu::BindResponse(BindResponse::decode(&header, &mut buf)?)
            }
            CommandId::SubmitSm => {
                Pdu::SubmitSm(Box::new(SubmitSm::decode(&header, &mut buf, cfg)?))
            }
            CommandId::SubmitSmResp => {
                Pdu::SubmitSmResp(<SubmitSmResp as Decodable>::decode(&header, &mut buf)?)
            }
            CommandId::DeliverSm => {
                Pdu::DeliverSm(Box::new(DeliverSm::decode(&header, &mut buf, cfg)?))
            }
            CommandId::DeliverSmResp => {
                Pdu::DeliverSmResp(<DeliverSmResp as Decodable>::decode(&header, &mut buf)?)
            }
            CommandId::EnquireLink => {
                Pdu::EnquireLink(<EnquireLink as Decodable>::decode(&header, &mut buf)?)
            }
            CommandId::EnquireLinkResp => {
                Pdu::EnquireLinkResp(<EnquireLinkResp as Decodable>::decode(&header, &mut buf)?)
            }
            CommandId::Unbind => Pdu::Unbind(<Unbind as Decodable>::decode(&header, &mut buf)?),
            CommandId::UnbindResp => {
                Pdu::UnbindResp(<UnbindResp as Decodable>::decode(&header, &mut buf)?)
            }
            CommandId::GenericNack => {
                Pdu::GenericNack(<GenericNack as Decodable>::decode(&header, &mut buf)?)
            }
        };
        Ok(pdu)
    }

    /// Encodes the PDU. Takes `&mut self` because encoding a submit_sm or
    /// deliver_sm may record the UCS-2 fallback on the message.
    pub fn to_bytes(&mut self, cfg: &EncodingConfig) -> Result<Bytes, CodecError> {
        match self {
            Pdu::BindRequest(pdu) => pdu.to_bytes(),
            Pdu::BindResponse(pdu) => pdu.to_bytes(),
            Pdu::SubmitSm(pdu) => pdu.to_pdu(cfg),
            Pdu::SubmitSmResp(pdu) => pdu.to_bytes(),
            Pdu::DeliverSm(pdu) => pdu.to_pdu(cfg),
            Pdu::DeliverSmResp(pdu) => pdu.to_bytes(),
            Pdu::EnquireLink(pdu) => pdu.to_bytes(),
            Pdu::EnquireLinkResp(pdu) => pdu.to_bytes(),
            Pdu::Unbind(pdu) => pdu.to_bytes(),
            Pdu::UnbindResp(pdu) => pdu.to_bytes(),
            Pdu::GenericNack(pdu) => pdu.to_bytes(),
        }
    }

    pub fn command_id(&self) -> CommandId {
        match self {
            Pdu::BindRequest(pdu) => pdu.command_id(),
            Pdu::BindResponse(pdu) => pdu.command,
            Pdu::SubmitSm(_) => CommandId::SubmitSm,
            Pdu::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Pdu::DeliverSm(_) => CommandId::DeliverSm,
            Pdu::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Pdu::EnquireLink(_) => CommandId::EnquireLink,
            Pdu::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Pdu::Unbind(_) => CommandId::Unbind,
            Pdu::UnbindResp(_) => CommandId::UnbindResp,
            Pdu::GenericNack(_) => CommandId::GenericNack,
        }
    }

    pub fn sequence_number(&self) -> u32 {
        match self {
            Pdu::BindRequest(pdu) => pdu.sequence_number,
            Pdu::BindResponse(pdu) => pdu.sequence_number,
            Pdu::SubmitSm(pdu) => pdu.sequence_number,
            Pdu::SubmitSmResp(pdu) => pdu.sequence_number,
            Pdu::DeliverSm(pdu) => pdu.sequence_number,
            Pdu::DeliverSmResp(pdu) => pdu.sequence_number,
            Pdu::EnquireLink(pdu) => pdu.sequence_number,
            Pdu::EnquireLinkResp(pdu) => pdu.sequence_number,
            Pdu::Unbind(pdu) => pdu.sequence_number,
            Pdu::UnbindResp(pdu) => pdu.sequence_number,
            Pdu::GenericNack(pdu) => pdu.sequence_number,
        }
    }

    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        match self {
            Pdu::BindRequest(pdu) => pdu.sequence_number = sequence_number,
            Pdu::BindResponse(pdu) => pdu.sequence_number = sequence_number,
            Pdu::SubmitSm(pdu) => pdu.sequence_number = sequence_number,
            Pdu::SubmitSmResp(pdu) => pdu.sequence_number = sequence_number,
            Pdu::DeliverSm(pdu) => pdu.sequence_number = sequence_number,
            Pdu::DeliverSmResp(pdu) => pdu.sequence_number = sequence_number,
            Pdu::EnquireLink(pdu) => pdu.sequence_number = sequence_number,
            Pdu::EnquireLinkResp(pdu) => pdu.sequence_number = sequence_number,
            Pdu::Unbind(pdu) => pdu.sequence_number = sequence_number,
            Pdu::UnbindResp(pdu) => pdu.sequence_number = sequence_number,
            Pdu::GenericNack(pdu) => pdu.sequence_number = sequence_number,
        }
    }

    /// Requests always report `Ok`; responses their actual status.
    pub fn command_status(&self) -> CommandStatus {
        match self {
            Pdu::BindResponse(pdu) => pdu.command_status,
            Pdu::SubmitSmResp(pdu) => pdu.command_status,
            Pdu::DeliverSmResp(pdu) => pdu.command_status,
            Pdu::EnquireLinkResp(pdu) => pdu.command_status,
            Pdu::UnbindResp(pdu) => pdu.command_status,
            Pdu::GenericNack(pdu) => pdu.command_status,
            _ => CommandStatus::Ok,
        }
    }

    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Builds the all-OK response answering an inbound request, or `None`
    /// for PDUs that take no response.
    pub fn ok_response(&self) -> Option<Pdu> {
        let sequence_number = self.sequence_number();
        match self {
            Pdu::DeliverSm(_) => Some(Pdu::DeliverSmResp(DeliverSmResp::new(sequence_number, ""))),
            Pdu::EnquireLink(_) => Some(Pdu::EnquireLinkResp(EnquireLinkResp::new(sequence_number))),
            Pdu::Unbind(_) => Some(Pdu::UnbindResp(UnbindResp::new(sequence_number))),
            _ => None,
        }
    }
}

impl fmt::Display for Pdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} (seq={}, status={:?})",
            self.command_id(),
            self.sequence_number(),
            self.command_status()
        )
    }
}
