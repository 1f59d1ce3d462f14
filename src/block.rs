// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component A — columnar block codec (spec.md §4.A).
//!
//! A block payload is `numOfCols` column runs. For column `c` with width
//! `w(c)` and `n` points, the run is `len(c)` bytes followed by a 32-bit
//! checksum of those bytes. The block descriptor (§4.B `SCompBlock`)
//! carries one `algorithm` flag for the whole block; when set, `len(c)`
//! is the compressed size and decoding must yield exactly
//! `n * w(c)` bytes.
//!
//! Column runs are stored back-to-back in schema order, so a reader that
//! wants column `k` must walk (not decode) every run before it to find
//! its offset — this is what lets "any column may be skipped without
//! reading" (only the length+checksum header, never the payload, is
//! touched for a skipped column).

use crate::checksum::Checksum;
use crate::coding::{DecodeError, EncodeError};
use crate::compression::CompressionType;
use crate::schema::ColumnType;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Cursor, Read, Write};

/// One column's decoded bytes, exactly `n * width` long.
#[derive(Clone, Debug)]
pub struct DecodedColumn {
    pub col_id: crate::schema::ColId,
    pub bytes: Vec<u8>,
}

/// Encodes one block payload from already-columnar input arrays.
///
/// `columns` is `(col_id, type, raw_bytes)` in schema/physical order;
/// `raw_bytes.len()` must equal `n * type.width()`.
///
/// # Errors
///
/// Never fails for `CompressionType::None`; with `lz4` this is infallible
/// too (lz4 block compression cannot fail on valid input).
pub fn encode_block(
    columns: &[(crate::schema::ColId, ColumnType, &[u8])],
    algorithm: CompressionType,
) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();

    for &(_, _, raw) in columns {
        let payload = algorithm.compress(raw);

        #[expect(clippy::cast_possible_truncation, reason = "column runs are block-sized")]
        out.write_u32::<LE>(payload.len() as u32)?;
        out.write_all(&payload)?;

        let checksum = Checksum::of(&payload);
        out.write_u32::<LE>(checksum.into_u32())?;
    }

    Ok(out)
}

/// Decodes one column from a block payload, skipping over every
/// preceding column run without decompressing it (spec.md §4.A: "any
/// column may be skipped without reading").
///
/// `target_index` is the column's position in the physical run order
/// (see `TableSchema::index_of`). `widths` gives every column's
/// `(n_points * width)` uncompressed length in the same physical order,
/// needed to know how many bytes to demand from the decompressor.
///
/// # Errors
///
/// `ShortRead` if the payload is truncated, `ChecksumMismatch` if a run's
/// trailer doesn't match, `Decompress` if decompression fails or
/// produces the wrong length.
pub fn decode_column(
    payload: &[u8],
    target_index: usize,
    uncompressed_lens: &[usize],
    algorithm: CompressionType,
) -> crate::Result<Vec<u8>> {
    let mut cursor = Cursor::new(payload);

    for (idx, &uncompressed_len) in uncompressed_lens.iter().enumerate() {
        let len = cursor.read_u32::<LE>().map_err(|_| crate::Error::ShortRead {
            expected: 4,
            got: (payload.len() as u64).saturating_sub(cursor.position()) as usize,
        })? as usize;

        let start = cursor.position() as usize;
        let end = start
            .checked_add(len)
            .ok_or(crate::Error::FileCorrupted("block column run length"))?;

        let run = payload
            .get(start..end)
            .ok_or(crate::Error::ShortRead { expected: len, got: payload.len().saturating_sub(start) })?;

        cursor.set_position(end as u64);
        let stored_checksum = Checksum::from_raw(cursor.read_u32::<LE>()?);
        let got_checksum = Checksum::of(run);
        got_checksum.check(stored_checksum)?;

        if idx == target_index {
            return algorithm.decompress(run, uncompressed_len);
        }
    }

    Err(crate::Error::FileCorrupted("column index out of range"))
}

/// Reads only the primary timestamp column (index 0), the common case
/// for `LoadTs` (spec.md §4.D): never touches any later run's payload.
pub fn decode_primary_timestamp(
    payload: &[u8],
    num_points: u32,
    algorithm: CompressionType,
) -> crate::Result<Vec<u8>> {
    let ts_len = num_points as usize * ColumnType::Timestamp.width() as usize;
    decode_column(payload, 0, &[ts_len], algorithm)
}

/// Block-type tag, kept distinct from `CompressionType` so corrupted
/// headers are rejected by tag mismatch before touching checksums.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockType {
    Data,
    Last,
}

impl TryFrom<u8> for BlockType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Data),
            1 => Ok(Self::Last),
            tag => Err(DecodeError::InvalidTag(("BlockType", tag))),
        }
    }
}

impl From<BlockType> for u8 {
    fn from(value: BlockType) -> Self {
        match value {
            BlockType::Data => 0,
            BlockType::Last => 1,
        }
    }
}
