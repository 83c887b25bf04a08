//! Error types for the driver and its filesystem-facing surface.

use alloc::string::String;

use thiserror::Error;

/// Failure of a single 9P exchange or of the bookkeeping around it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The transport could not move the buffers.
    #[error("transport error: {0}")]
    Transport(String),

    /// A message ended before a field it must contain.
    #[error("short buffer")]
    ShortBuffer,

    #[error("invalid utf8")]
    InvalidUtf8,

    /// The server answered with an error message; the payload is not decoded.
    #[error("server replied with error message type {msg_type}")]
    Remote { msg_type: u8 },

    #[error("unexpected response type {got} (expected {expected})")]
    UnexpectedResponse { expected: u8, got: u8 },

    #[error("tag mismatch: sent {expected}, got {got}")]
    TagMismatch { expected: u16, got: u16 },

    #[error("unsupported 9p version: {0}")]
    UnsupportedVersion(String),

    #[error("negotiated msize {0} is too small")]
    MsizeTooSmall(u32),

    /// A walk could not resolve every path element.
    #[error("path not found")]
    NotFound,

    #[error("path element of {0} bytes does not fit a 9p string")]
    NameTooLong(usize),

    /// An encoded request does not fit the negotiated message size.
    #[error("request of {size} bytes exceeds msize {msize}")]
    RequestTooLarge { size: usize, msize: u32 },

    #[error("no free fid left in this session")]
    FidExhausted,

    #[error("destination buffer too small")]
    BufferTooSmall,

    /// The file delivered a different number of bytes than getattr announced.
    #[error("read {got} bytes, expected {expected}")]
    SizeMismatch { expected: u64, got: u64 },

    #[error("file of {0} bytes cannot be cached")]
    FileTooLarge(u64),
}

/// Result vocabulary of the filesystem dispatch layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("driver error")]
    DriverError,
}

impl From<Error> for FsError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound => FsError::NotFound,
            _ => FsError::DriverError,
        }
    }
}
