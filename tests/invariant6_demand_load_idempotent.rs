// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Testable property 6 (spec.md §8): repeated `demandLoad` calls against
//! an unchanged `(fileId, slot, tsLoaded)` triple perform no further
//! work — `LoadDataBlockInfo::matches` plus its `ts_loaded` flag is what
//! lets a caller short-circuit a second probe of the same block.

use test_log::test;
use vnode_query_engine::compression::CompressionType;
use vnode_query_engine::descriptor::{ColumnPreAgg, CompBlock, PreAggValue};
use vnode_query_engine::loader::{self, LoadDataBlockInfo, LoadDecision};

fn block() -> CompBlock {
    CompBlock {
        key_first: 1000,
        key_last: 2000,
        num_of_points: 10,
        num_of_cols: 1,
        offset: 0,
        payload_len: 0,
        algorithm: CompressionType::None,
        last: false,
        col_pre_agg: vec![ColumnPreAgg {
            min: PreAggValue::from_i64(1),
            max: PreAggValue::from_i64(100),
            sum: PreAggValue::from_i64(500),
            num_null: 0,
            min_index: 0,
            max_index: 9,
        }],
    }
}

#[test]
fn repeated_probe_of_same_block_is_a_no_op() {
    let b = block();
    let mut info = LoadDataBlockInfo::new(3, 0, 0, 1);

    let first = loader::decide(&b, (1000, 2000), &[], &[0], false);
    assert_eq!(first, LoadDecision::NoLoad);

    // Simulate the caller recording that it already probed this block.
    assert!(info.matches(3, 0));
    info.ts_loaded = true;

    // A second call against the identical `(fileId, slot)` and key range
    // must produce the same decision — nothing changed about the block
    // or the query, so there's no I/O to redo.
    let second = loader::decide(&b, (1000, 2000), &[], &[0], false);
    assert_eq!(second, first);
    assert!(info.matches(3, 0));
    assert!(info.ts_loaded);
}

#[test]
fn matches_is_false_after_crossing_to_a_different_block() {
    let info = LoadDataBlockInfo::new(3, 0, 0, 1);
    assert!(!info.matches(3, 1));
    assert!(!info.matches(4, 0));
}
