//! Protocol error types.
//!
//! `ErrorCode` is what travels back to clients inside an `Error` response;
//! `ProtocolError` covers frames that cannot be turned into an envelope at
//! all.

use thiserror::Error;

/// Error codes carried by `Error` responses, as little-endian `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(i32)]
pub enum ErrorCode {
    #[error("invalid parameter")]
    InvalidParam = -1,
    #[error("out of memory")]
    NoMemory = -2,
    #[error("file not found")]
    FileNotFound = -3,
    #[error("file exists")]
    FileExists = -4,
    #[error("not found")]
    NotFound = -14,
    #[error("unsupported operation")]
    UnsupportedOperation = -15,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -1 => ErrorCode::InvalidParam,
            -2 => ErrorCode::NoMemory,
            -3 => ErrorCode::FileNotFound,
            -4 => ErrorCode::FileExists,
            -14 => ErrorCode::NotFound,
            -15 => ErrorCode::UnsupportedOperation,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{got:08X}")]
    BadMagic { expected: u32, got: u32 },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u16),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("checksum mismatch: header 0x{expected:08X}, computed 0x{computed:08X}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("truncated input: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },

    #[error("unexpected message type 0x{0:04X}")]
    UnexpectedMessage(u16),

    #[error("unknown error code {0}")]
    UnknownErrorCode(i32),
}
