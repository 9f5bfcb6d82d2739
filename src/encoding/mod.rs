// Text codecs for the encodings the SMPP data_coding register names, plus
// segmentation of long messages into concatenated parts.
//
// There is no process-wide codec registry: each session builds its own
// `CodecRegistry`, seeded with the built-in codecs and any user overrides.

mod gsm7;
mod segment;
mod ucs2;

pub use gsm7::{Gsm7Bit, Gsm7BitPacked, is_gsm_text, septet_count, septet_len};
pub use segment::{
    ConcatInfo, MAX_GSM_SEGMENT_SEPTETS, MAX_GSM_SINGLE_SEPTETS, MAX_UCS2_SEGMENT_OCTETS,
    MAX_UCS2_SINGLE_OCTETS, SegmentAlphabet, fits_single, new_reference, parse_udh, split_text,
};
pub use ucs2::Ucs2;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error handling policy for text conversion, with the conventional meaning:
/// `Strict` fails at the offending position, `Replace` substitutes a
/// fallback, `Ignore` drops the offending unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorHandling {
    #[default]
    Strict,
    Replace,
    Ignore,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    #[error("{encoding}: cannot encode {character:?} at position {position}")]
    Unencodable {
        encoding: &'static str,
        character: char,
        position: usize,
    },

    #[error("{encoding}: cannot decode byte {byte:#04x} at position {position}")]
    Undecodable {
        encoding: &'static str,
        byte: u8,
        position: usize,
    },

    #[error("{encoding}: input length {length} is not even")]
    OddLength {
        encoding: &'static str,
        length: usize,
    },

    #[error("unknown encoding `{0}`")]
    UnknownEncoding(String),
}

/// A text encoding scheme. Implementations must be stateless and shareable
/// across a session's tasks.
pub trait TextCodec: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, input: &str, errors: ErrorHandling) -> Result<Vec<u8>, TextError>;

    fn decode(&self, input: &[u8], errors: ErrorHandling) -> Result<String, TextError>;
}

/// IA5/ASCII (data_coding 0x01).
#[derive(Debug, Default, Clone, Copy)]
pub struct Ascii;

impl TextCodec for Ascii {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn encode(&self, input: &str, errors: ErrorHandling) -> Result<Vec<u8>, TextError> {
        let mut out = Vec::with_capacity(input.len());
        for (position, ch) in input.chars().enumerate() {
            if ch.is_ascii() {
                out.push(ch as u8);
            } else {
                match errors {
                    ErrorHandling::Strict => {
                        return Err(TextError::Unencodable {
                            encoding: "ascii",
                            character: ch,
                            position,
                        });
                    }
                    ErrorHandling::Replace => out.push(b'?'),
                    ErrorHandling::Ignore => {}
                }
            }
        }
        Ok(out)
    }

    fn decode(&self, input: &[u8], errors: ErrorHandling) -> Result<String, TextError> {
        let mut out = String::with_capacity(input.len());
        for (position, &byte) in input.iter().enumerate() {
            if byte < 0x80 {
                out.push(byte as char);
            } else {
                match errors {
                    ErrorHandling::Strict => {
                        return Err(TextError::Undecodable {
                            encoding: "ascii",
                            byte,
                            position,
                        });
                    }
                    ErrorHandling::Replace => out.push('\u{FFFD}'),
                    ErrorHandling::Ignore => {}
                }
            }
        }
        Ok(out)
    }
}

/// ISO 8859-1 (data_coding 0x03). Decoding cannot fail; encoding fails for
/// anything above U+00FF.
#[derive(Debug, Default, Clone, Copy)]
pub struct Latin1;

impl TextCodec for Latin1 {
    fn name(&self) -> &'static str {
        "latin_1"
    }

    fn encode(&self, input: &str, errors: ErrorHandling) -> Result<Vec<u8>, TextError> {
        let mut out = Vec::with_capacity(input.len());
        for (position, ch) in input.chars().enumerate() {
            if (ch as u32) <= 0xFF {
                out.push(ch as u8);
            } else {
                match errors {
                    ErrorHandling::Strict => {
                        return Err(TextError::Unencodable {
                            encoding: "latin_1",
                            character: ch,
                            position,
                        });
                    }
                    ErrorHandling::Replace => out.push(b'?'),
                    ErrorHandling::Ignore => {}
                }
            }
        }
        Ok(out)
    }

    fn decode(&self, input: &[u8], _errors: ErrorHandling) -> Result<String, TextError> {
        Ok(input.iter().map(|&byte| byte as char).collect())
    }
}

/// Per-session codec registry. User overrides are consulted before the
/// built-ins; a miss on both is an error rather than a silent fallback.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    custom: HashMap<String, Arc<dyn TextCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a user codec under its own name.
    pub fn register(&mut self, codec: Arc<dyn TextCodec>) {
        self.custom.insert(codec.name().to_owned(), codec);
    }

    pub fn lookup(&self, encoding: &str) -> Result<Arc<dyn TextCodec>, TextError> {
        if let Some(codec) = self.custom.get(encoding) {
            return Ok(Arc::clone(codec));
        }
        let built_in: Arc<dyn TextCodec> = match encoding {
            "gsm0338" => Arc::new(Gsm7Bit),
            "gsm0338-packed" => Arc::new(Gsm7BitPacked),
            "ucs2" => Arc::new(Ucs2),
            "ascii" => Arc::new(Ascii),
            "latin_1" => Arc::new(Latin1),
            _ => return Err(TextError::UnknownEncoding(encoding.to_owned())),
        };
        Ok(built_in)
    }

    pub fn encode(
        &self,
        encoding: &str,
        input: &str,
        errors: ErrorHandling,
    ) -> Result<Vec<u8>, TextError> {
        self.lookup(encoding)?.encode(input, errors)
    }

    pub fn decode(
        &self,
        encoding: &str,
        input: &[u8],
        errors: ErrorHandling,
    ) -> Result<String, TextError> {
        self.lookup(encoding)?.decode(input, errors)
    }
}

/// The text-encoding environment of one session: the SMSC default alphabet
/// and the codec registry (built-ins plus user overrides).
#[derive(Clone, Debug)]
pub struct EncodingConfig {
    pub default_encoding: String,
    pub registry: CodecRegistry,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        EncodingConfig {
            default_encoding: "gsm0338".to_owned(),
            registry: CodecRegistry::new(),
        }
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
