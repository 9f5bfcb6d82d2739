// UCS-2 as used by SMPP: big-endian UTF-16 without a BOM.

use crate::encoding::{ErrorHandling, TextCodec, TextError};

const REPLACEMENT: char = '\u{FFFD}';

#[derive(Debug, Default, Clone, Copy)]
pub struct Ucs2;

impl TextCodec for Ucs2 {
    fn name(&self) -> &'static str {
        "ucs2"
    }

    fn encode(&self, input: &str, _errors: ErrorHandling) -> Result<Vec<u8>, TextError> {
        let mut out = Vec::with_capacity(input.len() * 2);
        for unit in input.encode_utf16() {
            out.extend_from_slice(&unit.to_be_bytes());
        }
        Ok(out)
    }

    fn decode(&self, input: &[u8], errors: ErrorHandling) -> Result<String, TextError> {
        if input.len() % 2 != 0 {
            match errors {
                ErrorHandling::Strict => {
                    return Err(TextError::OddLength {
                        encoding: "ucs2",
                        length: input.len(),
                    });
                }
                // Truncated trailing byte decodes as one replacement char
                // below; Ignore just drops it.
                ErrorHandling::Replace | ErrorHandling::Ignore => {}
            }
        }

        let units: Vec<u16> = input
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        let mut result = String::with_capacity(units.len());
        for (position, decoded) in char::decode_utf16(units.iter().copied()).enumerate() {
            match decoded {
                Ok(ch) => result.push(ch),
                Err(_) => match errors {
                    ErrorHandling::Strict => {
                        return Err(TextError::Undecodable {
                            encoding: "ucs2",
                            byte: input[position * 2],
                            position: position * 2,
                        });
                    }
                    ErrorHandling::Replace => result.push(REPLACEMENT),
                    ErrorHandling::Ignore => {}
                },
            }
        }
        if input.len() % 2 != 0 && errors == ErrorHandling::Replace {
            result.push(REPLACEMENT);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        let codec = Ucs2;
        let encoded = codec.encode("H\u{00FC}lk", ErrorHandling::Strict).unwrap();
        assert_eq!(encoded, [0x00, 0x48, 0x00, 0xFC, 0x00, 0x6C, 0x00, 0x6B]);
        assert_eq!(
            codec.decode(&encoded, ErrorHandling::Strict).unwrap(),
            "H\u{00FC}lk"
        );
    }

    #[test]
    fn surrogate_pairs_roundtrip() {
        let codec = Ucs2;
        let text = "\u{1F607}\u{1F976}\u{1F970}";
        let encoded = codec.encode(text, ErrorHandling::Strict).unwrap();
        assert_eq!(encoded.len(), 12);
        assert_eq!(codec.decode(&encoded, ErrorHandling::Strict).unwrap(), text);
    }

    #[test]
    fn odd_length_is_strict_failure() {
        let codec = Ucs2;
        let data = [0x00, 0x48, 0x00];
        assert!(matches!(
            codec.decode(&data, ErrorHandling::Strict),
            Err(TextError::OddLength { length: 3, .. })
        ));
        assert_eq!(
            codec.decode(&data, ErrorHandling::Replace).unwrap(),
            "H\u{FFFD}"
        );
        assert_eq!(codec.decode(&data, ErrorHandling::Ignore).unwrap(), "H");
    }

    #[test]
    fn lone_surrogate_handling() {
        let codec = Ucs2;
        let data = [0xD8, 0x3D, 0x00, 0x41]; // high surrogate then 'A'
        assert!(codec.decode(&data, ErrorHandling::Strict).is_err());
        assert_eq!(
            codec.decode(&data, ErrorHandling::Replace).unwrap(),
            "\u{FFFD}A"
        );
        assert_eq!(codec.decode(&data, ErrorHandling::Ignore).unwrap(), "A");
    }
}
