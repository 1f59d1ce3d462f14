// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! S6 (spec.md §8): a reader thread runs `count(*)` against the cache
//! ring while a writer thread concurrently recycles the oldest slot. The
//! reader must observe either the old or the new row count, never a
//! value outside that range, and must not panic.

use std::sync::{Arc, Barrier};
use std::thread;
use test_log::test;
use vnode_query_engine::cache_ring::{CacheBlock, CacheRing, SlotOutcome};

fn block(block_id: u64, ts: Vec<i64>) -> CacheBlock {
    let n = ts.len();
    CacheBlock { block_id, num_of_points: n as u32, timestamps: ts, columns: vec![vec![0u8; n * 4]] }
}

#[test]
fn reader_observes_consistent_count_across_a_concurrent_write() {
    let ring = Arc::new(CacheRing::new(4));
    ring.write_slot_for_test(0, block(1, vec![100, 200, 300]), 0, 0, 0, 0);
    let old_count = 3;
    let new_count = 4;

    let barrier = Arc::new(Barrier::new(2));

    let writer = {
        let ring = Arc::clone(&ring);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            // Simulates a new row landing that recycles slot 0 with a
            // bumped block id, as spec.md §5 guarantees: readers either
            // observe the pre-write snapshot or the post-write one, and
            // a stale slot is detected via `block_id`, never torn.
            ring.write_slot_for_test(0, block(2, vec![100, 200, 300, 400]), 0, 0, 0, 0);
        })
    };

    let reader = {
        let ring = Arc::clone(&ring);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let snapshot = ring.snapshot();
            match ring.read_slot(&snapshot, 0) {
                SlotOutcome::Valid(b) => b.timestamps.len(),
                SlotOutcome::FlushedOrInvalidated => 0,
            }
        })
    };

    writer.join().unwrap();
    let observed = reader.join().unwrap();

    assert!(
        observed == 0 || observed == old_count || observed == new_count,
        "observed count {observed} outside the range a consistent snapshot could produce"
    );
}
