// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Per-column compression algorithm, stored as the block descriptor's
/// `algorithm` byte (spec.md §3/§4.A). `None` means the column run is
/// stored verbatim; any other variant means the decoder keyed by the
/// variant (not by the column's value type — widths are handled by the
/// caller, who knows `numOfPoints * width`) must be invoked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum CompressionType {
    /// Column run stored verbatim.
    None,

    /// LZ4 block compression, keyed by the exact decompressed length.
    #[cfg(feature = "lz4")]
    Lz4,
}

impl CompressionType {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            #[cfg(feature = "lz4")]
            Self::Lz4 => 1,
        }
    }

    /// Compresses `src`. With `None` this is a cheap copy, matching the
    /// teacher's uniform `CompressionType` seam even for the no-op case.
    #[must_use]
    pub fn compress(self, src: &[u8]) -> Vec<u8> {
        match self {
            Self::None => src.to_vec(),
            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::block::compress(src),
        }
    }

    /// Decompresses `src` into exactly `uncompressed_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decompress` if the decoder fails or produces a
    /// length other than `uncompressed_len`.
    pub fn decompress(self, src: &[u8], uncompressed_len: usize) -> crate::Result<Vec<u8>> {
        match self {
            Self::None => {
                if src.len() != uncompressed_len {
                    return Err(crate::Error::ShortRead {
                        expected: uncompressed_len,
                        got: src.len(),
                    });
                }
                Ok(src.to_vec())
            }
            #[cfg(feature = "lz4")]
            Self::Lz4 => lz4_flex::block::decompress(src, uncompressed_len)
                .map_err(|_| crate::Error::Decompress(self)),
        }
    }
}

impl Encode for CompressionType {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u8(self.tag())?;
        Ok(())
    }
}

impl Decode for CompressionType {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::None),

            #[cfg(feature = "lz4")]
            1 => Ok(Self::Lz4),

            tag => Err(DecodeError::InvalidTag(("CompressionType", tag))),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "no compression",
                #[cfg(feature = "lz4")]
                Self::Lz4 => "lz4",
            }
        )
    }
}
