// Numbering Plan Indicator constants (SMPP v3.4 section 5.2.6).

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Npi {
    #[default]
    Unknown = 0b0000_0000,
    Isdn = 0b0000_0001,
    Data = 0b0000_0011,
    Telex = 0b0000_0100,
    LandMobile = 0b0000_0110,
    National = 0b0000_1000,
    Private = 0b0000_1001,
    Ermes = 0b0000_1010,
    Internet = 0b0000_1110,
    WapClientId = 0b0001_0010,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_register() {
        assert_eq!(Npi::Isdn as u8, 1);
        assert_eq!(Npi::WapClientId as u8, 18);
        assert!(Npi::try_from(0x02u8).is_err());
    }
}
