// Concatenated SMS (CSMS) via the GSM 03.38 User Data Header: splitting
// long texts into parts that share a reference number, and parsing the UDH
// of inbound parts.

use crate::encoding::gsm7::septet_len;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Septet capacity of a single GSM SMS.
pub const MAX_GSM_SINGLE_SEPTETS: usize = 160;
/// Septet capacity of one GSM part carrying an 8-bit concatenation UDH.
pub const MAX_GSM_SEGMENT_SEPTETS: usize = 153;
/// Octet capacity of a single UCS-2 SMS.
pub const MAX_UCS2_SINGLE_OCTETS: usize = 140;
/// Octet capacity of one UCS-2 part carrying an 8-bit concatenation UDH.
pub const MAX_UCS2_SEGMENT_OCTETS: usize = 134;

// 16-bit references use a 7-octet UDH instead of 6, costing one more septet
// (GSM) or two more octets (UCS-2) per part.
const WIDE_REF_EXTRA_SEPTETS: usize = 1;
const WIDE_REF_EXTRA_OCTETS: usize = 1;

/// The alphabet a message will go out in, for capacity computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentAlphabet {
    Gsm,
    Ucs2,
}

/// Concatenation info carried in the UDH of one part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatInfo {
    pub ref_num: u16,
    pub total: u8,
    pub seq: u8,
    /// True when the reference is carried in the 16-bit IE (0x08).
    pub wide_ref: bool,
}

impl ConcatInfo {
    /// Renders the UDH for this part: `05 00 03 ref total seq` for 8-bit
    /// references, `06 08 04 ref_hi ref_lo total seq` for 16-bit.
    pub fn to_udh(self) -> Vec<u8> {
        if self.wide_ref {
            let [hi, lo] = self.ref_num.to_be_bytes();
            vec![0x06, 0x08, 0x04, hi, lo, self.total, self.seq]
        } else {
            vec![0x05, 0x00, 0x03, self.ref_num as u8, self.total, self.seq]
        }
    }

    pub fn udh_len(self) -> usize {
        if self.wide_ref { 7 } else { 6 }
    }
}

/// Picks a fresh concatenation reference: random 8-bit by default, random
/// 16-bit when `wide` is set.
pub fn new_reference(wide: bool) -> u16 {
    let mut rng = rand::thread_rng();
    if wide {
        rng.r#gen::<u16>()
    } else {
        rng.r#gen::<u8>() as u16
    }
}

/// Parses a UDH at the start of `data`. Returns the concatenation info (if a
/// concatenation IE is present; other IEs are skipped) and the offset of the
/// message text behind the header. `None` if the header is malformed.
pub fn parse_udh(data: &[u8]) -> Option<(Option<ConcatInfo>, usize)> {
    let udh_len = *data.first()? as usize;
    if data.len() < udh_len + 1 {
        return None;
    }
    let mut concat = None;
    let mut index = 1;
    while index + 1 < udh_len + 1 {
        let ie_id = data[index];
        let ie_len = data[index + 1] as usize;
        let ie_end = index + 2 + ie_len;
        if ie_end > udh_len + 1 {
            return None;
        }
        let ie_data = &data[index + 2..ie_end];
        match (ie_id, ie_len) {
            (0x00, 3) => {
                concat = Some(ConcatInfo {
                    ref_num: ie_data[0] as u16,
                    total: ie_data[1],
                    seq: ie_data[2],
                    wide_ref: false,
                });
            }
            (0x08, 4) => {
                concat = Some(ConcatInfo {
                    ref_num: u16::from_be_bytes([ie_data[0], ie_data[1]]),
                    total: ie_data[2],
                    seq: ie_data[3],
                    wide_ref: true,
                });
            }
            _ => {}
        }
        index = ie_end;
    }
    Some((concat, udh_len + 1))
}

/// True if `text` fits in a single SMS without any UDH.
pub fn fits_single(text: &str, alphabet: SegmentAlphabet) -> bool {
    match alphabet {
        SegmentAlphabet::Gsm => {
            text.chars().map(septet_len).sum::<usize>() <= MAX_GSM_SINGLE_SEPTETS
        }
        SegmentAlphabet::Ucs2 => text.encode_utf16().count() * 2 <= MAX_UCS2_SINGLE_OCTETS,
    }
}

/// Splits `text` into per-part strings, each fitting one SMS with a
/// concatenation UDH. Boundaries are character boundaries, so a GSM escape
/// pair never straddles parts; UCS-2 boundaries step back one code unit
/// rather than splitting a surrogate pair.
pub fn split_text(text: &str, alphabet: SegmentAlphabet, wide_ref: bool) -> Vec<String> {
    match alphabet {
        SegmentAlphabet::Gsm => {
            let limit = MAX_GSM_SEGMENT_SEPTETS
                - if wide_ref { WIDE_REF_EXTRA_SEPTETS } else { 0 };
            let mut parts = Vec::new();
            let mut current = String::new();
            let mut septets = 0usize;
            for ch in text.chars() {
                let cost = septet_len(ch);
                if septets + cost > limit {
                    parts.push(std::mem::take(&mut current));
                    septets = 0;
                }
                current.push(ch);
                septets += cost;
            }
            if !current.is_empty() {
                parts.push(current);
            }
            parts
        }
        SegmentAlphabet::Ucs2 => {
            let limit_units = (MAX_UCS2_SEGMENT_OCTETS
                - if wide_ref { 2 * WIDE_REF_EXTRA_OCTETS } else { 0 })
                / 2;
            let units: Vec<u16> = text.encode_utf16().collect();
            let mut parts = Vec::new();
            let mut start = 0usize;
            while start < units.len() {
                let mut end = (start + limit_units).min(units.len());
                // Do not end a part on a high surrogate whose pair follows.
                if end < units.len() && (0xD800..0xDC00).contains(&units[end - 1]) {
                    end -= 1;
                }
                parts.push(String::from_utf16_lossy(&units[start..end]));
                start = end;
            }
            parts
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udh_eight_bit_layout() {
        let info = ConcatInfo {
            ref_num: 0x35,
            total: 2,
            seq: 1,
            wide_ref: false,
        };
        assert_eq!(info.to_udh(), [0x05, 0x00, 0x03, 0x35, 0x02, 0x01]);
    }

    #[test]
    fn udh_sixteen_bit_layout() {
        let info = ConcatInfo {
            ref_num: 0x1234,
            total: 3,
            seq: 2,
            wide_ref: true,
        };
        assert_eq!(info.to_udh(), [0x06, 0x08, 0x04, 0x12, 0x34, 0x03, 0x02]);
    }

    #[test]
    fn udh_roundtrip() {
        for wide in [false, true] {
            let info = ConcatInfo {
                ref_num: if wide { 0xABCD } else { 0x42 },
                total: 6,
                seq: 3,
                wide_ref: wide,
            };
            let mut data = info.to_udh();
            data.extend_from_slice(b"payload");
            let (parsed, offset) = parse_udh(&data).unwrap();
            assert_eq!(parsed, Some(info));
            assert_eq!(&data[offset..], b"payload");
        }
    }

    #[test]
    fn udh_with_unknown_ie_only() {
        // port addressing IE (0x05), no concatenation present
        let data = [0x06, 0x05, 0x04, 0x0B, 0x84, 0x0B, 0x84, b'x'];
        let (parsed, offset) = parse_udh(&data).unwrap();
        assert_eq!(parsed, None);
        assert_eq!(offset, 7);
    }

    #[test]
    fn udh_truncated_is_rejected() {
        assert_eq!(parse_udh(&[0x05, 0x00, 0x03]), None);
        assert_eq!(parse_udh(&[]), None);
    }

    #[test]
    fn short_gsm_text_fits_single() {
        assert!(fits_single(&"a".repeat(160), SegmentAlphabet::Gsm));
        assert!(!fits_single(&"a".repeat(161), SegmentAlphabet::Gsm));
    }

    #[test]
    fn ucs2_single_capacity_is_seventy_chars() {
        assert!(fits_single(&"\u{0161}".repeat(70), SegmentAlphabet::Ucs2));
        assert!(!fits_single(&"\u{0161}".repeat(71), SegmentAlphabet::Ucs2));
    }

    #[test]
    fn three_hundred_gsm_chars_make_two_parts() {
        let text = "a".repeat(300);
        let parts = split_text(&text, SegmentAlphabet::Gsm, false);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 153);
        assert_eq!(parts[1].len(), 147);
    }

    #[test]
    fn escape_pair_never_straddles_parts() {
        // 152 plain chars, then a euro sign (2 septets): the euro must move
        // whole to the second part.
        let mut text = "a".repeat(152);
        text.push('\u{20AC}');
        text.push_str(&"b".repeat(10));
        let parts = split_text(&text, SegmentAlphabet::Gsm, false);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "a".repeat(152));
        assert!(parts[1].starts_with('\u{20AC}'));
    }

    #[test]
    fn surrogate_pair_never_straddles_parts() {
        // 66 BMP chars then an emoji: its two code units would sit at
        // positions 67-68, so the boundary steps back to 66.
        let mut text = "x".repeat(66);
        text.push('\u{1F607}');
        text.push_str(&"y".repeat(80));
        let parts = split_text(&text, SegmentAlphabet::Ucs2, false);
        assert_eq!(parts[0], "x".repeat(66));
        assert!(parts[1].starts_with('\u{1F607}'));
        for part in &parts {
            assert!(part.encode_utf16().count() <= 67);
        }
    }

    #[test]
    fn split_parts_reassemble() {
        let text = "jako ".repeat(100);
        let parts = split_text(&text, SegmentAlphabet::Gsm, false);
        assert_eq!(parts.concat(), text);

        let text = "\u{1F607}\u{1F976}\u{1F970}".repeat(40);
        let parts = split_text(&text, SegmentAlphabet::Ucs2, false);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn reference_width() {
        for _ in 0..32 {
            assert!(new_reference(false) <= 0xFF);
        }
    }
}
