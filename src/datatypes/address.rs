// SMPP addresses: a phone number (or alphanumeric sender id) with its
// TON/NPI pair. Address fields on the wire are C-octet strings of at most
// 21 octets including the terminator.

use crate::datatypes::{Npi, Ton};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of characters in an address (terminator excluded).
pub const MAX_ADDRESS_LENGTH: usize = 20;

/// A phone number or alphanumeric identifier together with its type-of-number
/// and numbering-plan-indicator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub number: String,
    pub ton: Ton,
    pub npi: Npi,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is {actual} characters long, maximum is {max}")]
    TooLong { max: usize, actual: usize },

    #[error("address must be printable ASCII")]
    NotAscii,
}

impl PhoneNumber {
    pub fn new(
        number: impl Into<String>,
        ton: Ton,
        npi: Npi,
    ) -> Result<Self, AddressError> {
        let number = number.into();
        if number.len() > MAX_ADDRESS_LENGTH {
            return Err(AddressError::TooLong {
                max: MAX_ADDRESS_LENGTH,
                actual: number.len(),
            });
        }
        if !number.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(AddressError::NotAscii);
        }
        Ok(PhoneNumber { number, ton, npi })
    }

    /// International number, e.g. `+38599123456`.
    pub fn international(number: impl Into<String>) -> Result<Self, AddressError> {
        Self::new(number, Ton::International, Npi::Isdn)
    }

    /// Alphanumeric sender id, e.g. `INFO`.
    pub fn alphanumeric(number: impl Into<String>) -> Result<Self, AddressError> {
        Self::new(number, Ton::Alphanumeric, Npi::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_empty()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ton={:?}, npi={:?})", self.number, self.ton, self.npi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plus_prefixed_international() {
        let number = PhoneNumber::international("+123135654618").unwrap();
        assert_eq!(number.ton, Ton::International);
        assert_eq!(number.npi, Npi::Isdn);
        assert_eq!(number.number, "+123135654618");
    }

    #[test]
    fn alphanumeric_sender() {
        let sender = PhoneNumber::alphanumeric("INFO").unwrap();
        assert_eq!(sender.ton, Ton::Alphanumeric);
        assert_eq!(sender.npi, Npi::Unknown);
    }

    #[test]
    fn rejects_over_long_number() {
        let result = PhoneNumber::new("1".repeat(21), Ton::Unknown, Npi::Unknown);
        assert_eq!(
            result,
            Err(AddressError::TooLong {
                max: 20,
                actual: 21
            })
        );
    }

    #[test]
    fn rejects_non_ascii() {
        assert_eq!(
            PhoneNumber::new("čevap", Ton::Unknown, Npi::Unknown),
            Err(AddressError::NotAscii)
        );
    }
}
