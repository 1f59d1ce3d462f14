// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::checksum::Checksum;
use crate::coding::{DecodeError, EncodeError};
use crate::compression::CompressionType;

/// Errors surfaced by the query pipeline.
///
/// Kinds and recovery policy follow spec.md §7: checksum/structural
/// corruption and bad query parameters are surfaced to the caller;
/// missing files and stale cache reads are recovered internally and never
/// reach this type.
#[derive(Debug)]
pub enum Error {
    /// I/O error talking to a day-file.
    Io(std::io::Error),

    /// On-disk structure failed to decode.
    Decode(DecodeError),

    /// On-disk structure failed to encode (only reachable when building
    /// fixtures with the same codec the reader uses).
    Encode(EncodeError),

    /// A stored checksum did not match the recomputed one.
    ChecksumMismatch { expected: Checksum, got: Checksum },

    /// A column's compressed payload did not decompress to the expected
    /// `numOfPoints * width` length, or the decoder itself failed.
    Decompress(CompressionType),

    /// The header offset table, comp-info, or block vector failed its
    /// whole-segment checksum (spec.md §4.B).
    FileCorrupted(&'static str),

    /// A read returned fewer bytes than the column/run length demanded.
    ShortRead { expected: usize, got: usize },

    /// Spill buffer could not grow (`ftruncate`/`mremap` failed).
    NoDiskSpace,

    /// Arena or spill allocation failed.
    OutOfMemory,

    /// Rejected at `prepare()`: duplicate column id, inconsistent types,
    /// a precision/interval mismatch, or similar. Carries a short reason.
    InvalidQuery(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueryError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
