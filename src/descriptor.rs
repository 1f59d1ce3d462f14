// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Component B — header index reader (spec.md §4.B) and the on-disk
//! block-descriptor types it parses (spec.md §3 "Block-index segment",
//! §6.1).

use crate::checksum::Checksum;
use crate::compression::CompressionType;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, RwLock};

/// A raw 8-byte union holding either an `i64` or an `f64` pre-aggregate,
/// same representation TDengine's on-disk format uses — interpretation
/// is deferred to whoever knows the column's type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PreAggValue(pub [u8; 8]);

impl PreAggValue {
    #[must_use]
    pub fn from_i64(v: i64) -> Self {
        Self(v.to_le_bytes())
    }

    #[must_use]
    pub fn from_f64(v: f64) -> Self {
        Self(v.to_le_bytes())
    }

    #[must_use]
    pub fn as_i64(self) -> i64 {
        i64::from_le_bytes(self.0)
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from_le_bytes(self.0)
    }
}

/// Per-column pre-aggregate carried alongside a block descriptor
/// (spec.md §3, §4.D). `min_index`/`max_index` (row offset within the
/// block of the extreme value) are recovered from
/// `examples/original_source` and let `top`/`bottom` seed their
/// interval-heap from metadata alone (spec.md §4.D `NoLoad` rule).
#[derive(Copy, Clone, Debug)]
pub struct ColumnPreAgg {
    pub min: PreAggValue,
    pub max: PreAggValue,
    pub sum: PreAggValue,
    pub num_null: u32,
    pub min_index: u32,
    pub max_index: u32,
}

impl ColumnPreAgg {
    fn encode<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_all(&self.min.0)?;
        w.write_all(&self.max.0)?;
        w.write_all(&self.sum.0)?;
        w.write_u32::<LE>(self.num_null)?;
        w.write_u32::<LE>(self.min_index)?;
        w.write_u32::<LE>(self.max_index)?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> std::io::Result<Self> {
        let mut min = [0u8; 8];
        let mut max = [0u8; 8];
        let mut sum = [0u8; 8];
        r.read_exact(&mut min)?;
        r.read_exact(&mut max)?;
        r.read_exact(&mut sum)?;
        let num_null = r.read_u32::<LE>()?;
        let min_index = r.read_u32::<LE>()?;
        let max_index = r.read_u32::<LE>()?;
        Ok(Self {
            min: PreAggValue(min),
            max: PreAggValue(max),
            sum: PreAggValue(sum),
            num_null,
            min_index,
            max_index,
        })
    }
}

/// One `SCompBlock` descriptor (spec.md §3/§6.1).
#[derive(Clone, Debug)]
pub struct CompBlock {
    pub key_first: i64,
    pub key_last: i64,
    pub num_of_points: u32,
    pub num_of_cols: u16,
    pub offset: i64,
    pub payload_len: u32,
    pub algorithm: CompressionType,
    /// Block lives in the `.last` file rather than `.data`.
    pub last: bool,
    pub col_pre_agg: Vec<ColumnPreAgg>,
}

impl CompBlock {
    fn encode<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        w.write_i64::<LE>(self.key_first)?;
        w.write_i64::<LE>(self.key_last)?;
        w.write_u32::<LE>(self.num_of_points)?;
        w.write_u16::<LE>(self.num_of_cols)?;
        w.write_i64::<LE>(self.offset)?;
        w.write_u32::<LE>(self.payload_len)?;
        w.write_u8(self.algorithm.tag())?;
        w.write_u8(u8::from(self.last))?;
        #[expect(clippy::cast_possible_truncation)]
        w.write_u16::<LE>(self.col_pre_agg.len() as u16)?;
        for pa in &self.col_pre_agg {
            pa.encode(w)?;
        }
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> crate::Result<Self> {
        let key_first = r.read_i64::<LE>()?;
        let key_last = r.read_i64::<LE>()?;
        let num_of_points = r.read_u32::<LE>()?;
        let num_of_cols = r.read_u16::<LE>()?;
        let offset = r.read_i64::<LE>()?;
        let payload_len = r.read_u32::<LE>()?;
        let algo_tag = r.read_u8()?;
        let algorithm = match algo_tag {
            0 => CompressionType::None,
            #[cfg(feature = "lz4")]
            1 => CompressionType::Lz4,
            tag => {
                return Err(crate::Error::Decode(crate::coding::DecodeError::InvalidTag((
                    "CompressionType",
                    tag,
                ))))
            }
        };
        let last = r.read_u8()? != 0;
        let pre_agg_count = r.read_u16::<LE>()?;
        let mut col_pre_agg = Vec::with_capacity(pre_agg_count as usize);
        for _ in 0..pre_agg_count {
            col_pre_agg.push(ColumnPreAgg::decode(r)?);
        }

        if key_first > key_last {
            return Err(crate::Error::FileCorrupted("block keyFirst > keyLast"));
        }

        Ok(Self {
            key_first,
            key_last,
            num_of_points,
            num_of_cols,
            offset,
            payload_len,
            algorithm,
            last,
            col_pre_agg,
        })
    }
}

/// Parsed `SCompInfo` plus its block vector: one table's whole block
/// index for one day-file (spec.md §4.B step 2–3).
#[derive(Clone, Debug)]
pub struct CompInfo {
    pub uid: u64,
    pub blocks: Vec<CompBlock>,
}

/// Reads and memoises block-index segments (spec.md §4.B).
///
/// Invariant: the segment for `(file_list_index, table_sid)` is re-read
/// only when that pair changes from the last call, or `invalidate` is
/// called explicitly — repeated calls with the same key are free.
pub struct HeaderIndexReader {
    memo: RwLock<HashMap<(i32, u32), Arc<CompInfo>>>,
}

impl Default for HeaderIndexReader {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderIndexReader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memo: RwLock::new(HashMap::new()),
        }
    }

    /// Reads and checksum-verifies the per-table offset table.
    ///
    /// # Errors
    ///
    /// `FileCorrupted` if the whole-segment checksum does not match
    /// (spec.md §4.B step 1).
    pub fn read_offset_table<R: Read + Seek>(
        reader: &mut R,
        max_sessions: u32,
    ) -> crate::Result<Vec<i64>> {
        reader.seek(SeekFrom::Start(crate::file::TSDB_FILE_HEADER_LEN as u64))?;

        let mut bytes = vec![0u8; max_sessions as usize * 8];
        reader.read_exact(&mut bytes)?;
        let stored = Checksum::from_raw(reader.read_u32::<LE>()?);

        Checksum::of(&bytes).check(stored).map_err(|_| {
            crate::Error::FileCorrupted("header offset table checksum mismatch")
        })?;

        let mut cursor = std::io::Cursor::new(bytes);
        let mut offsets = Vec::with_capacity(max_sessions as usize);
        for _ in 0..max_sessions {
            offsets.push(cursor.read_i64::<LE>()?);
        }
        Ok(offsets)
    }

    /// Loads (or returns the memoised) block index for `table_sid` in
    /// file `file_list_index`, verifying it belongs to `table_uid`.
    ///
    /// Returns `Ok(None)` when the table has no data in this file (a
    /// `uid` mismatch or a zero offset) — spec.md §4.B step 2, not an
    /// error.
    ///
    /// # Errors
    ///
    /// `FileCorrupted` on any checksum mismatch in the comp-info header
    /// or the block vector.
    pub fn load<R: Read + Seek>(
        &self,
        reader: &mut R,
        file_list_index: i32,
        table_sid: u32,
        table_uid: u64,
        max_sessions: u32,
    ) -> crate::Result<Option<Arc<CompInfo>>> {
        let key = (file_list_index, table_sid);

        if let Some(cached) = self.memo.read().expect("lock poisoned").get(&key) {
            return Ok(Some(Arc::clone(cached)));
        }

        let offsets = Self::read_offset_table(reader, max_sessions)?;
        let Some(&offset) = offsets.get(table_sid as usize) else {
            return Ok(None);
        };
        if offset <= 0 {
            return Ok(None);
        }

        reader.seek(SeekFrom::Start(offset as u64))?;

        let num_of_blocks = reader.read_i32::<LE>()?;
        let uid = reader.read_u64::<LE>()?;
        let header_checksum = Checksum::from_raw(reader.read_u32::<LE>()?);

        let mut header_bytes = Vec::with_capacity(12);
        header_bytes.extend_from_slice(&num_of_blocks.to_le_bytes());
        header_bytes.extend_from_slice(&uid.to_le_bytes());
        Checksum::of(&header_bytes)
            .check(header_checksum)
            .map_err(|_| crate::Error::FileCorrupted("comp-info checksum mismatch"))?;

        if uid != table_uid {
            // Not an error: this table simply has no data in this file.
            return Ok(None);
        }

        if num_of_blocks < 0 {
            return Err(crate::Error::FileCorrupted("negative numOfBlocks"));
        }

        let mut blocks = Vec::with_capacity(num_of_blocks as usize);
        let mut block_bytes = Vec::new();
        for _ in 0..num_of_blocks {
            let mut tee = Vec::new();
            let mut limited = ByteCountingReader {
                inner: &mut *reader,
                sink: &mut tee,
            };
            let block = CompBlock::decode(&mut limited)?;
            block_bytes.extend_from_slice(&tee);
            blocks.push(block);
        }

        let trailer_checksum = Checksum::from_raw(reader.read_u32::<LE>()?);
        Checksum::of(&block_bytes)
            .check(trailer_checksum)
            .map_err(|_| crate::Error::FileCorrupted("block vector checksum mismatch"))?;

        validate_block_ordering(&blocks)?;

        let info = Arc::new(CompInfo { uid, blocks });
        self.memo
            .write()
            .expect("lock poisoned")
            .insert(key, Arc::clone(&info));
        Ok(Some(info))
    }

    /// Drops the memoised segment for `(file_list_index, table_sid)`,
    /// forcing the next `load` to re-read from disk.
    pub fn invalidate(&self, file_list_index: i32, table_sid: u32) {
        self.memo
            .write()
            .expect("lock poisoned")
            .remove(&(file_list_index, table_sid));
    }
}

/// Testable property 2 (spec.md §8): consecutive blocks do not overlap.
fn validate_block_ordering(blocks: &[CompBlock]) -> crate::Result<()> {
    for pair in blocks.windows(2) {
        if pair[0].key_last > pair[1].key_first {
            return Err(crate::Error::FileCorrupted("block index out of order"));
        }
    }
    Ok(())
}

/// Tees every byte read through `inner` into `sink`, so the checksum
/// verifier can hash exactly the bytes a `Decode` impl consumed without
/// re-serializing it.
struct ByteCountingReader<'a, R> {
    inner: R,
    sink: &'a mut Vec<u8>,
}

impl<R: Read> Read for ByteCountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sink.extend_from_slice(&buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_block(key_first: i64, key_last: i64) -> CompBlock {
        CompBlock {
            key_first,
            key_last,
            num_of_points: 3,
            num_of_cols: 2,
            offset: 0,
            payload_len: 64,
            algorithm: CompressionType::None,
            last: false,
            col_pre_agg: vec![ColumnPreAgg {
                min: PreAggValue::from_i64(key_first),
                max: PreAggValue::from_i64(key_last),
                sum: PreAggValue::from_i64(key_first + key_last),
                num_null: 0,
                min_index: 0,
                max_index: 2,
            }],
        }
    }

    fn write_table(
        buf: &mut Vec<u8>,
        max_sessions: u32,
        table_sid: u32,
        uid: u64,
        blocks: &[CompBlock],
    ) {
        buf.resize(crate::file::TSDB_FILE_HEADER_LEN, 0);

        let segment_offset = crate::file::TSDB_FILE_HEADER_LEN + max_sessions as usize * 8 + 4;

        let mut offsets = vec![0i64; max_sessions as usize];
        offsets[table_sid as usize] = segment_offset as i64;
        let mut offset_bytes = Vec::new();
        for o in &offsets {
            offset_bytes.write_i64::<LE>(*o).unwrap();
        }
        buf.extend_from_slice(&offset_bytes);
        buf.write_u32::<LE>(Checksum::of(&offset_bytes).into_u32()).unwrap();

        assert_eq!(buf.len(), segment_offset);

        let mut header_bytes = Vec::new();
        header_bytes.extend_from_slice(&(blocks.len() as i32).to_le_bytes());
        header_bytes.extend_from_slice(&uid.to_le_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.write_u32::<LE>(Checksum::of(&header_bytes).into_u32()).unwrap();

        let mut block_bytes = Vec::new();
        for b in blocks {
            b.encode(&mut block_bytes).unwrap();
        }
        buf.extend_from_slice(&block_bytes);
        buf.write_u32::<LE>(Checksum::of(&block_bytes).into_u32()).unwrap();
    }

    #[test]
    fn loads_and_memoises() {
        let blocks = vec![sample_block(1000, 2000), sample_block(2500, 3000)];
        let mut buf = Vec::new();
        write_table(&mut buf, 4, 1, 42, &blocks);

        let reader = HeaderIndexReader::new();
        let mut cursor = Cursor::new(buf);

        let info = reader.load(&mut cursor, 0, 1, 42, 4).unwrap().unwrap();
        assert_eq!(info.blocks.len(), 2);
        assert_eq!(info.blocks[0].key_first, 1000);

        // second call must not re-parse (cursor position unchanged proves nothing
        // directly, so assert the returned Arc is the same allocation).
        let info2 = reader.load(&mut cursor, 0, 1, 42, 4).unwrap().unwrap();
        assert!(Arc::ptr_eq(&info, &info2));
    }

    #[test]
    fn uid_mismatch_is_not_an_error() {
        let blocks = vec![sample_block(1000, 2000)];
        let mut buf = Vec::new();
        write_table(&mut buf, 4, 1, 42, &blocks);

        let reader = HeaderIndexReader::new();
        let mut cursor = Cursor::new(buf);
        let result = reader.load(&mut cursor, 0, 1, 999, 4).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn rejects_out_of_order_blocks() {
        let blocks = vec![sample_block(1000, 3000), sample_block(2000, 4000)];
        let mut buf = Vec::new();
        write_table(&mut buf, 4, 1, 42, &blocks);

        let reader = HeaderIndexReader::new();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            reader.load(&mut cursor, 0, 1, 42, 4),
            Err(crate::Error::FileCorrupted(_))
        ));
    }

    #[test]
    fn detects_offset_table_corruption() {
        let blocks = vec![sample_block(1000, 2000)];
        let mut buf = Vec::new();
        write_table(&mut buf, 4, 1, 42, &blocks);
        buf[crate::file::TSDB_FILE_HEADER_LEN] ^= 0xFF;

        let reader = HeaderIndexReader::new();
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            reader.load(&mut cursor, 0, 1, 42, 4),
            Err(crate::Error::FileCorrupted(_))
        ));
    }
}
