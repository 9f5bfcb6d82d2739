// SMPP v3.4 command status codes (specification section 5.1.3).

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// SMPP v3.4 command status.
///
/// Requests always carry `Ok`; responses carry the actual outcome. Only
/// `Ok` is success. `Throttled` and `MessageQueueFull` feed the adaptive
/// throttle handler; `AlreadyBound` is tolerated on bind.
#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    Ok = 0x0000_0000,
    InvalidMsgLength = 0x0000_0001,
    InvalidCommandLength = 0x0000_0002,
    InvalidCommandId = 0x0000_0003,
    IncorrectBindStatus = 0x0000_0004,
    AlreadyBound = 0x0000_0005,
    InvalidPriorityFlag = 0x0000_0006,
    InvalidRegisteredDeliveryFlag = 0x0000_0007,
    SystemError = 0x0000_0008,
    InvalidSourceAddress = 0x0000_000A,
    InvalidDestinationAddress = 0x0000_000B,
    InvalidMessageId = 0x0000_000C,
    BindFailed = 0x0000_000D,
    InvalidPassword = 0x0000_000E,
    InvalidSystemId = 0x0000_000F,
    CancelSmFailed = 0x0000_0011,
    ReplaceSmFailed = 0x0000_0013,
    MessageQueueFull = 0x0000_0014,
    InvalidServiceType = 0x0000_0015,
    InvalidNumberOfDestinations = 0x0000_0033,
    InvalidDistributionListName = 0x0000_0034,
    InvalidDestinationFlag = 0x0000_0040,
    InvalidSubmitWithReplace = 0x0000_0042,
    InvalidEsmClass = 0x0000_0043,
    CannotSubmitToDistributionList = 0x0000_0044,
    SubmitFailed = 0x0000_0045,
    InvalidSourceTon = 0x0000_0048,
    InvalidSourceNpi = 0x0000_0049,
    InvalidDestinationTon = 0x0000_0050,
    InvalidDestinationNpi = 0x0000_0051,
    InvalidSystemType = 0x0000_0053,
    InvalidReplaceFlag = 0x0000_0054,
    InvalidNumberOfMessages = 0x0000_0055,
    Throttled = 0x0000_0058,
    InvalidScheduledDeliveryTime = 0x0000_0061,
    InvalidValidityPeriod = 0x0000_0062,
    InvalidDefaultMsgId = 0x0000_0063,
    ReceiverTemporaryError = 0x0000_0064,
    ReceiverPermanentError = 0x0000_0065,
    ReceiverRejectError = 0x0000_0066,
    QueryFailed = 0x0000_0067,
    InvalidOptionalParamStream = 0x0000_00C0,
    OptionalParamNotAllowed = 0x0000_00C1,
    InvalidParamLength = 0x0000_00C2,
    MissingOptionalParam = 0x0000_00C3,
    InvalidOptionalParamValue = 0x0000_00C4,
    DeliveryFailure = 0x0000_00FE,
    UnknownError = 0x0000_00FF,
}

impl CommandStatus {
    pub fn is_ok(self) -> bool {
        self == CommandStatus::Ok
    }

    /// True for the statuses that must be fed to the throttle handler.
    pub fn is_throttling(self) -> bool {
        matches!(
            self,
            CommandStatus::Throttled | CommandStatus::MessageQueueFull
        )
    }

    /// Human-readable description per the SMPP v3.4 register.
    pub fn description(self) -> &'static str {
        match self {
            CommandStatus::Ok => "Success",
            CommandStatus::InvalidMsgLength => "Message Length is invalid",
            CommandStatus::InvalidCommandLength => "Command Length is invalid",
            CommandStatus::InvalidCommandId => "Invalid Command ID",
            CommandStatus::IncorrectBindStatus => "Incorrect BIND Status for given command",
            CommandStatus::AlreadyBound => "ESME Already in Bound State",
            CommandStatus::InvalidPriorityFlag => "Invalid Priority Flag",
            CommandStatus::InvalidRegisteredDeliveryFlag => "Invalid Registered Delivery Flag",
            CommandStatus::SystemError => "System Error",
            CommandStatus::InvalidSourceAddress => "Invalid Source Address",
            CommandStatus::InvalidDestinationAddress => "Invalid Dest Addr",
            CommandStatus::InvalidMessageId => "Message ID is invalid",
            CommandStatus::BindFailed => "Bind Failed",
            CommandStatus::InvalidPassword => "Invalid Password",
            CommandStatus::InvalidSystemId => "Invalid System ID",
            CommandStatus::CancelSmFailed => "Cancel SM Failed",
            CommandStatus::ReplaceSmFailed => "Replace SM Failed",
            CommandStatus::MessageQueueFull => "Message Queue Full",
            CommandStatus::InvalidServiceType => "Invalid Service Type",
            CommandStatus::InvalidNumberOfDestinations => "Invalid number of destinations",
            CommandStatus::InvalidDistributionListName => "Invalid Distribution List name",
            CommandStatus::InvalidDestinationFlag => "Destination flag is invalid",
            CommandStatus::InvalidSubmitWithReplace => "Invalid submit with replace request",
            CommandStatus::InvalidEsmClass => "Invalid esm_class field data",
            CommandStatus::CannotSubmitToDistributionList => {
                "Cannot Submit to Distribution List"
            }
            CommandStatus::SubmitFailed => "submit_sm or submit_multi failed",
            CommandStatus::InvalidSourceTon => "Invalid Source address TON",
            CommandStatus::InvalidSourceNpi => "Invalid Source address NPI",
            CommandStatus::InvalidDestinationTon => "Invalid Destination address TON",
            CommandStatus::InvalidDestinationNpi => "Invalid Destination address NPI",
            CommandStatus::InvalidSystemType => "Invalid system_type field",
            CommandStatus::InvalidReplaceFlag => "Invalid replace_if_present flag",
            CommandStatus::InvalidNumberOfMessages => "Invalid number of messages",
            CommandStatus::Throttled => {
                "Throttling error (ESME has exceeded allowed message limits)"
            }
            CommandStatus::InvalidScheduledDeliveryTime => "Invalid Scheduled Delivery Time",
            CommandStatus::InvalidValidityPeriod => "Invalid message validity period",
            CommandStatus::InvalidDefaultMsgId => "Predefined Message Invalid or Not Found",
            CommandStatus::ReceiverTemporaryError => "ESME Receiver Temporary App Error Code",
            CommandStatus::ReceiverPermanentError => "ESME Receiver Permanent App Error Code",
            CommandStatus::ReceiverRejectError => "ESME Receiver Reject Message Error Code",
            CommandStatus::QueryFailed => "query_sm request failed",
            CommandStatus::InvalidOptionalParamStream => {
                "Error in the optional part of the PDU Body"
            }
            CommandStatus::OptionalParamNotAllowed => "Optional Parameter not allowed",
            CommandStatus::InvalidParamLength => "Invalid Parameter Length",
            CommandStatus::MissingOptionalParam => "Expected Optional Parameter missing",
            CommandStatus::InvalidOptionalParamValue => "Invalid Optional Parameter Value",
            CommandStatus::DeliveryFailure => "Delivery Failure",
            CommandStatus::UnknownError => "Unknown Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_classification() {
        assert!(CommandStatus::Throttled.is_throttling());
        assert!(CommandStatus::MessageQueueFull.is_throttling());
        assert!(!CommandStatus::Ok.is_throttling());
        assert!(!CommandStatus::SystemError.is_throttling());
    }

    #[test]
    fn numeric_values_match_register() {
        assert_eq!(CommandStatus::Ok as u32, 0);
        assert_eq!(CommandStatus::AlreadyBound as u32, 0x05);
        assert_eq!(CommandStatus::Throttled as u32, 0x58);
        assert_eq!(CommandStatus::MessageQueueFull as u32, 0x14);
        assert_eq!(CommandStatus::UnknownError as u32, 0xFF);
    }

    #[test]
    fn try_from_unknown_fails() {
        assert!(CommandStatus::try_from(0x0000_0009u32).is_err());
        assert!(CommandStatus::try_from(0xDEAD_BEEFu32).is_err());
    }
}
