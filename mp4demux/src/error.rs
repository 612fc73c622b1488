//! Error type of the demuxer.
//!
use std::io;

use thiserror::Error;

use crate::types::FourCC;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the demuxer.
///
/// Byte-level parsing runs on `io::Result` internally; the conversion
/// below sorts the `io::ErrorKind`s into the right variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Empty path, out-of-range track index, and the like.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// OS-level open/seek/read failure, or a short read.
    #[error("i/o error: {0}")]
    Io(#[source] io::Error),

    /// A box size that does not fit its parent, or a payload shorter
    /// than a mandatory field.
    #[error("malformed box: {0}")]
    MalformedSize(String),

    /// A sample table that must appear at most once per track occurred twice.
    #[error("duplicate {0} table")]
    DuplicateTable(FourCC),

    /// Sample tables disagree with each other.
    #[error("inconsistent sample tables: {0}")]
    Protocol(String),

    /// Allocation failure for a derived table.
    #[error("out of memory")]
    OutOfMemory,

    /// Unknown track id, or a seek that cannot resolve a sample.
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied buffer cannot hold the requested payload.
    #[error("buffer too small: need {needed} bytes")]
    BufferTooSmall { needed: u64 },

    /// Valid but intentionally unsupported construct.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::InvalidData => Error::MalformedSize(e.to_string()),
            io::ErrorKind::Unsupported => Error::NotSupported(e.to_string()),
            _ => Error::Io(e),
        }
    }
}
