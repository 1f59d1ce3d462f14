// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! S5 (spec.md §8): tamper one byte in block B of a three-block file;
//! the query must surface `ChecksumMismatch` for block B without
//! touching (or corrupting the read of) blocks A and C.

use test_log::test;
use vnode_query_engine::block::{decode_column, encode_block};
use vnode_query_engine::compression::CompressionType;
use vnode_query_engine::schema::ColumnType;
use vnode_query_engine::Error;

fn ts_column(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn corrupting_block_b_does_not_affect_blocks_a_or_c() {
    let block_a = ts_column(&[1000, 1500, 2000]);
    let block_b = ts_column(&[2500, 3000]);
    let block_c = ts_column(&[3500, 4000, 4500]);

    let payload_a =
        encode_block(&[(0, ColumnType::Timestamp, &block_a)], CompressionType::None).unwrap();
    let mut payload_b =
        encode_block(&[(0, ColumnType::Timestamp, &block_b)], CompressionType::None).unwrap();
    let payload_c =
        encode_block(&[(0, ColumnType::Timestamp, &block_c)], CompressionType::None).unwrap();

    // Tamper a byte inside block B's column payload (past its 4-byte
    // length prefix), leaving its checksum trailer stale.
    payload_b[4] ^= 0xFF;

    let a = decode_column(&payload_a, 0, &[block_a.len()], CompressionType::None);
    let b = decode_column(&payload_b, 0, &[block_b.len()], CompressionType::None);
    let c = decode_column(&payload_c, 0, &[block_c.len()], CompressionType::None);

    assert_eq!(a.unwrap(), block_a);
    assert!(matches!(b, Err(Error::ChecksumMismatch { .. })));
    assert_eq!(c.unwrap(), block_c);
}
