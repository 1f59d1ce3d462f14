// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Decoded-block cache (spec.md §5 "Caching").
//!
//! Wraps the per-column decode result of a single on-disk block so a
//! second query touching the same `(fileListIndex, tableSid, blockId,
//! colId)` within the same process doesn't re-read and re-decompress
//! it. This sits *above* the demand loader (Component D): the loader
//! decides whether a column needs loading at all, this cache decides
//! whether loading it means touching disk.

use quick_cache::sync::Cache as QuickCache;
use quick_cache::Weighter;
use std::sync::Arc;

#[derive(Eq, PartialEq, std::hash::Hash, Clone, Copy)]
struct CacheKey {
    file_list_index: i32,
    table_sid: i32,
    block_id: u64,
    col_id: crate::schema::ColId,
}

#[derive(Clone)]
struct ColumnWeighter;

impl Weighter<CacheKey, Arc<Vec<u8>>> for ColumnWeighter {
    fn weight(&self, _: &CacheKey, value: &Arc<Vec<u8>>) -> u64 {
        value.len() as u64
    }
}

/// Process-wide cache of decoded column runs, shared across tables and
/// queries via `Arc` (spec.md §5, `Config::use_cache`).
pub struct BlockCache {
    data: QuickCache<CacheKey, Arc<Vec<u8>>, ColumnWeighter, rustc_hash::FxBuildHasher>,
    capacity: u64,
}

impl BlockCache {
    #[must_use]
    pub fn with_capacity_bytes(bytes: u64) -> Self {
        #[allow(clippy::expect_used)]
        let opts = quick_cache::OptionsBuilder::new()
            .weight_capacity(bytes)
            .hot_allocation(0.9)
            .estimated_items_capacity(10_000)
            .build()
            .expect("cache options should be valid");

        #[allow(clippy::default_trait_access)]
        let data = QuickCache::with_options(
            opts,
            ColumnWeighter,
            Default::default(),
            quick_cache::sync::DefaultLifecycle::default(),
        );

        Self { data, capacity: bytes }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.data.weight()
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn get(
        &self,
        file_list_index: i32,
        table_sid: i32,
        block_id: u64,
        col_id: crate::schema::ColId,
    ) -> Option<Arc<Vec<u8>>> {
        let key = CacheKey { file_list_index, table_sid, block_id, col_id };
        self.data.get(&key)
    }

    pub fn insert(
        &self,
        file_list_index: i32,
        table_sid: i32,
        block_id: u64,
        col_id: crate::schema::ColId,
        bytes: Arc<Vec<u8>>,
    ) {
        let key = CacheKey { file_list_index, table_sid, block_id, col_id };
        self.data.insert(key, bytes);
    }

    /// Drops every entry for a table, used when a file is discarded
    /// (spec.md §7 "File discarded mid-query") or a block is
    /// invalidated by the write path.
    pub fn invalidate_table(&self, file_list_index: i32, table_sid: i32) {
        self.data.retain(|k, _| k.file_list_index != file_list_index || k.table_sid != table_sid);
        log::trace!(
            "invalidated cache entries for file_list_index={file_list_index} table_sid={table_sid}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let cache = BlockCache::with_capacity_bytes(1_024 * 1_024);
        let bytes = Arc::new(vec![1u8, 2, 3, 4]);
        cache.insert(0, 5, 100, 0, bytes.clone());
        assert_eq!(cache.get(0, 5, 100, 0), Some(bytes));
    }

    #[test]
    fn miss_on_unrelated_key() {
        let cache = BlockCache::with_capacity_bytes(1_024 * 1_024);
        cache.insert(0, 5, 100, 0, Arc::new(vec![1u8]));
        assert_eq!(cache.get(0, 5, 100, 1), None);
        assert_eq!(cache.get(0, 6, 100, 0), None);
    }

    #[test]
    fn invalidate_table_drops_only_that_table() {
        let cache = BlockCache::with_capacity_bytes(1_024 * 1_024);
        cache.insert(0, 5, 100, 0, Arc::new(vec![1u8]));
        cache.insert(0, 6, 100, 0, Arc::new(vec![2u8]));

        cache.invalidate_table(0, 5);

        assert_eq!(cache.get(0, 5, 100, 0), None);
        assert!(cache.get(0, 6, 100, 0).is_some());
    }
}
