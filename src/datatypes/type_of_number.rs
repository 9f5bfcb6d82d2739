// Type of Number constants (SMPP v3.4 section 5.2.5).

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Ton {
    #[default]
    Unknown = 0b0000_0000,
    International = 0b0000_0001,
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_register() {
        assert_eq!(Ton::International as u8, 1);
        assert_eq!(Ton::Alphanumeric as u8, 5);
        assert!(Ton::try_from(0x07u8).is_err());
    }
}
