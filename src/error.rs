// error.rs — error taxonomy for the decode pipeline

use thiserror::Error;

/// Outcome of a failed decode cycle.
///
/// Only [`DecodeError::FatalSync`] and [`DecodeError::FatalStarvation`] are
/// fatal: the byte stream can not be trusted any more and the device must be
/// restarted. Everything else aborts the current cycle only.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("lost sync: first byte 0x{found:02X}, expected 0xDB")]
    FatalSync { found: u8 },
    #[error("no data from meter for {reads} consecutive reads")]
    FatalStarvation { reads: u32 },
    #[error("no telegram available")]
    NoData,
    #[error("frame does not start with sync marker (got 0x{found:02X})")]
    Framing { found: u8 },
    #[error("frame too short: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },
    #[error("declared length needs {needed} bytes, buffer holds {capacity}")]
    Oversize { needed: usize, capacity: usize },
    #[error("authentication tag mismatch")]
    Authentication,
}

impl DecodeError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::FatalSync { .. } | DecodeError::FatalStarvation { .. }
        )
    }
}

/// Per-line problems found while extracting registers.
/// These never abort a cycle; the offending line is skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("unknown OBIS id {0:?}")]
    Unmatched(String),
    #[error("no closing parenthesis")]
    MissingParens,
    #[error("hex value has odd length {0}")]
    OddHexLength(usize),
    #[error("invalid hex digit {0:?}")]
    InvalidHexDigit(char),
    #[error("hex value does not decode to text")]
    NonTextHex,
    #[error("line is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

pub type AppResult<T> = Result<T, AppError>;

// EOF
