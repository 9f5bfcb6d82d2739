mod address;
mod bind;
mod command_id;
mod command_status;
mod data_coding;
mod datetime;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod numeric_plan_indicator;
mod submit_sm;
pub mod tlv;
mod type_of_number;
mod unbind;

pub use address::{AddressError, MAX_ADDRESS_LENGTH, PhoneNumber};
pub use bind::{
    BindMode, BindRequest, BindResponse, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_SYSTEM_ID_LENGTH, MAX_SYSTEM_TYPE_LENGTH, SMPP_VERSION_3_4,
};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_coding::DataCoding;
pub use datetime::{SmppTime, TimeError, time_to_wire};
pub use deliver_sm::{DeliverSm, DeliverSmResp, DeliveryReceipt};
pub use enquire_link::{EnquireLink, EnquireLinkResp};
pub use generic_nack::GenericNack;
pub use numeric_plan_indicator::Npi;
pub use submit_sm::{SubmitSm, SubmitSmResp};
pub use tlv::{OptionalParam, OptionalTag, OptionalValue, ValueKind};
pub use type_of_number::Ton;
pub use unbind::{Unbind, UnbindResp};

/// esm_class bit 6: a User Data Header precedes the short message text.
pub const ESM_UDHI: u8 = 0b0100_0000;
