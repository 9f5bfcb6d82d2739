// The SMPP 16-character time format (specification section 7.1):
// absolute `YYMMDDhhmmsstnnp` where t is tenths of a second, nn the UTC
// offset in quarter hours and p its sign, or relative `YYMMDDhhmmss000R`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const SMPP_TIME_LENGTH: usize = 16;
const MAX_RELATIVE: Duration = Duration::from_secs(63 * 7 * 24 * 3600);

/// A schedule_delivery_time or validity_period value.
///
/// Relative times are capped at 63 weeks; the conversion uses the SMPP
/// convention of 365-day years and 30-day months.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmppTime {
    Absolute {
        year: u8,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        tenths: u8,
        /// Absolute UTC offset in quarter hours.
        offset_quarters: u8,
        offset_negative: bool,
    },
    Relative(Duration),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("SMPP time string must be {SMPP_TIME_LENGTH} characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid character in SMPP time string at position {0}")]
    InvalidCharacter(usize),

    #[error("field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },

    #[error("maximum message validity is 63 weeks")]
    TooLong,
}

impl SmppTime {
    pub fn relative(duration: Duration) -> Result<Self, TimeError> {
        if duration > MAX_RELATIVE {
            return Err(TimeError::TooLong);
        }
        Ok(SmppTime::Relative(duration))
    }

    /// Renders the 16-character wire string.
    pub fn to_smpp_string(&self) -> Result<String, TimeError> {
        match *self {
            SmppTime::Absolute {
                year,
                month,
                day,
                hour,
                minute,
                second,
                tenths,
                offset_quarters,
                offset_negative,
            } => {
                let sign = if offset_negative { '-' } else { '+' };
                Ok(format!(
                    "{year:02}{month:02}{day:02}{hour:02}{minute:02}{second:02}\
                     {tenths}{offset_quarters:02}{sign}"
                ))
            }
            SmppTime::Relative(duration) => {
                if duration > MAX_RELATIVE {
                    return Err(TimeError::TooLong);
                }
                let total_days = duration.as_secs() / 86_400;
                let years = total_days / 365;
                let months = (total_days % 365) / 30;
                let days = (total_days % 365) % 30;
                let day_seconds = duration.as_secs() % 86_400;
                let hours = day_seconds / 3600;
                let minutes = (day_seconds % 3600) / 60;
                let seconds = day_seconds % 60;
                Ok(format!(
                    "{years:02}{months:02}{days:02}{hours:02}{minutes:02}{seconds:02}000R"
                ))
            }
        }
    }

    /// Parses a wire string. Empty input means "immediate" and maps to `None`.
    pub fn parse(input: &str) -> Result<Option<Self>, TimeError> {
        if input.is_empty() {
            return Ok(None);
        }
        if input.len() != SMPP_TIME_LENGTH {
            return Err(TimeError::InvalidLength(input.len()));
        }
        let bytes = input.as_bytes();
        let two = |index: usize| -> Result<u8, TimeError> {
            let high = bytes[index];
            let low = bytes[index + 1];
            if !high.is_ascii_digit() || !low.is_ascii_digit() {
                return Err(TimeError::InvalidCharacter(index));
            }
            Ok((high - b'0') * 10 + (low - b'0'))
        };

        let year = two(0)?;
        let month = two(2)?;
        let day = two(4)?;
        let hour = two(6)?;
        let minute = two(8)?;
        let second = two(10)?;

        if bytes[15] == b'R' {
            let total_days = year as u64 * 365 + month as u64 * 30 + day as u64;
            let seconds = hour as u64 * 3600 + minute as u64 * 60 + second as u64;
            let duration = Duration::from_secs(total_days * 86_400 + seconds);
            return Ok(Some(SmppTime::relative(duration)?));
        }

        if month == 0 || month > 12 {
            return Err(TimeError::OutOfRange {
                field: "month",
                value: month as u32,
            });
        }
        if day == 0 || day > 31 {
            return Err(TimeError::OutOfRange {
                field: "day",
                value: day as u32,
            });
        }
        if hour > 23 || minute > 59 || second > 59 {
            return Err(TimeError::OutOfRange {
                field: "time",
                value: hour as u32 * 10_000 + minute as u32 * 100 + second as u32,
            });
        }

        if !bytes[12].is_ascii_digit() {
            return Err(TimeError::InvalidCharacter(12));
        }
        let tenths = bytes[12] - b'0';
        let offset_quarters = two(13)?;
        let offset_negative = match bytes[15] {
            b'+' => false,
            b'-' => true,
            _ => return Err(TimeError::InvalidCharacter(15)),
        };

        Ok(Some(SmppTime::Absolute {
            year,
            month,
            day,
            hour,
            minute,
            second,
            tenths,
            offset_quarters,
            offset_negative,
        }))
    }
}

/// Renders `None` as the empty (immediate) wire string.
pub fn time_to_wire(time: &Option<SmppTime>) -> Result<String, TimeError> {
    match time {
        Some(value) => value.to_smpp_string(),
        None => Ok(String::new()),
    }
}

impl fmt::Display for SmppTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_smpp_string() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<invalid>"),
        }
    }
}
