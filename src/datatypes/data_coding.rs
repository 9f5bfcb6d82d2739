// The data_coding field register (SMPP v3.4 section 5.2.19), restricted to
// the schemes the specification names. The wire value 0 means "SMSC default
// alphabet"; the session configuration decides what that alphabet is.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

#[derive(TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataCoding {
    #[default]
    SmscDefault = 0b0000_0000,
    Ascii = 0b0000_0001,
    OctetUnspecified1 = 0b0000_0010,
    Latin1 = 0b0000_0011,
    OctetUnspecified2 = 0b0000_0100,
    Jis = 0b0000_0101,
    Cyrillic = 0b0000_0110,
    LatinHebrew = 0b0000_0111,
    Ucs2 = 0b0000_1000,
    PictogramEncoding = 0b0000_1001,
    Iso2022JpMusicCodes = 0b0000_1010,
    ExtendedKanjiJis = 0b0000_1101,
    KsC5601 = 0b0000_1110,
}

impl DataCoding {
    /// The codec-registry name for this scheme, if text en/decoding for it
    /// is meaningful (the octet-unspecified values carry binary payloads).
    pub fn encoding_name(self) -> Option<&'static str> {
        match self {
            DataCoding::SmscDefault => Some("gsm0338"),
            DataCoding::Ascii => Some("ascii"),
            DataCoding::Latin1 => Some("latin_1"),
            DataCoding::Ucs2 => Some("ucs2"),
            _ => None,
        }
    }

    /// Maps a codec-registry name to the wire value the SMSC expects.
    /// Names without a register entry (such as the packed GSM variant used
    /// by some SMSCs as their default alphabet) encode as `SmscDefault`.
    pub fn from_encoding_name(name: &str) -> DataCoding {
        match name {
            "ascii" => DataCoding::Ascii,
            "latin_1" => DataCoding::Latin1,
            "ucs2" => DataCoding::Ucs2,
            _ => DataCoding::SmscDefault,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_values() {
        assert_eq!(DataCoding::SmscDefault as u8, 0);
        assert_eq!(DataCoding::Ucs2 as u8, 8);
        assert_eq!(DataCoding::KsC5601 as u8, 14);
        assert!(DataCoding::try_from(0x0Bu8).is_err()); // reserved
    }

    #[test]
    fn name_mapping() {
        assert_eq!(DataCoding::Ucs2.encoding_name(), Some("ucs2"));
        assert_eq!(DataCoding::OctetUnspecified1.encoding_name(), None);
        assert_eq!(DataCoding::from_encoding_name("ucs2"), DataCoding::Ucs2);
        assert_eq!(
            DataCoding::from_encoding_name("gsm0338"),
            DataCoding::SmscDefault
        );
        assert_eq!(
            DataCoding::from_encoding_name("gsm0338-packed"),
            DataCoding::SmscDefault
        );
    }
}
