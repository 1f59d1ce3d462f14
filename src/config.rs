// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Runtime configuration (spec.md SPEC_FULL.md §C').
//!
//! Mirrors the teacher's fluent `Config::new(path)....open()` builder,
//! but the thing being "opened" is a `QueryRuntimeConfig` bundle handed
//! to the scanner, not a tree.

use crate::cache::BlockCache;
use crate::compression::CompressionType;
use crate::fd_table::FileDescriptorTable;
use crate::path::absolute_path;
use crate::spill::SpillRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Timestamp precision a vnode's on-disk data is stored in (spec.md §3,
/// Open Question "Precision vs. interval time unit mismatch").
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Precision {
    Milliseconds,
    Microseconds,
}

impl Precision {
    /// Converts a duration given in `unit` to this precision's units, or
    /// `None` if the conversion is not exact (spec.md SPEC_FULL.md §C'
    /// Open Question resolution (c)).
    #[must_use]
    pub fn convert_exact(self, value: i64, unit: Self) -> Option<i64> {
        match (unit, self) {
            (Self::Milliseconds, Self::Milliseconds) | (Self::Microseconds, Self::Microseconds) => {
                Some(value)
            }
            (Self::Milliseconds, Self::Microseconds) => value.checked_mul(1_000),
            (Self::Microseconds, Self::Milliseconds) => {
                (value % 1_000 == 0).then_some(value / 1_000)
            }
        }
    }
}

const DEFAULT_CONFIG_FOLDER: &str = ".vnode-query";

/// Runtime configuration for one process's worth of vnode query
/// execution (spec.md §5 "shared, process-wide" state).
#[derive(Clone)]
pub struct Config {
    #[doc(hidden)]
    pub data_root: PathBuf,

    /// On-disk timestamp precision (spec.md §3).
    pub precision: Precision,

    /// Number of calendar days of data stored per day-file (spec.md §3).
    pub days_per_file: u32,

    /// Cache ring capacity per table (spec.md §3/§4.E `maxBlocks`).
    pub max_blocks: usize,

    /// Target row count per on-disk block at write time, used by the
    /// block locator's gap heuristics (spec.md §4.A/§4.C).
    pub points_per_file_block: u32,

    /// Max width in bytes of a variable-length column, used to size
    /// decode scratch buffers (spec.md §3).
    pub max_col_width: u32,

    /// Default capacity of the sliding-window hash index (spec.md §9
    /// Open Question: hardcoded `10000` in the original, kept here as a
    /// configurable default of the same value).
    pub default_sliding_hash_capacity: usize,

    /// Page size for the window engine's spill-to-disk path (spec.md
    /// §4.H "Compaction/spill to fixed-size pages").
    pub spill_page_size: usize,

    /// Max number of concurrent query sessions sharing this config's
    /// caches (spec.md §5).
    pub max_sessions: usize,

    /// Default compression algorithm assumed when a block descriptor
    /// doesn't carry its own (should not normally happen; defensive
    /// default for `§7` degraded-read paths).
    pub compression: CompressionType,

    #[doc(hidden)]
    pub cache: Arc<BlockCache>,

    #[doc(hidden)]
    pub descriptor_table: Arc<FileDescriptorTable>,

    #[doc(hidden)]
    pub spill_registry: Arc<SpillRegistry>,
}

impl Config {
    /// Initializes a new config rooted at `data_root` (the vnode's data
    /// directory, spec.md §3 "Day-file set").
    #[must_use]
    pub fn new<P: AsRef<Path>>(data_root: P) -> Self {
        let data_root = absolute_path(data_root.as_ref());

        Self {
            descriptor_table: Arc::new(FileDescriptorTable::new(data_root.clone(), 128)),
            data_root,
            precision: Precision::Milliseconds,
            days_per_file: 10,
            max_blocks: 16,
            points_per_file_block: 4_096,
            max_col_width: 16 * 1_024,
            default_sliding_hash_capacity: 10_000,
            spill_page_size: 64 * 1_024,
            max_sessions: 64,
            compression: CompressionType::None,
            cache: Arc::new(BlockCache::with_capacity_bytes(16 * 1_024 * 1_024)),
            spill_registry: Arc::new(SpillRegistry::new()),
        }
    }

    #[must_use]
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn days_per_file(mut self, days: u32) -> Self {
        self.days_per_file = days;
        self
    }

    #[must_use]
    pub fn max_blocks(mut self, n: usize) -> Self {
        self.max_blocks = n;
        self
    }

    #[must_use]
    pub fn points_per_file_block(mut self, n: u32) -> Self {
        self.points_per_file_block = n;
        self
    }

    #[must_use]
    pub fn max_col_width(mut self, bytes: u32) -> Self {
        self.max_col_width = bytes;
        self
    }

    #[must_use]
    pub fn default_sliding_hash_capacity(mut self, n: usize) -> Self {
        self.default_sliding_hash_capacity = n;
        self
    }

    #[must_use]
    pub fn spill_page_size(mut self, bytes: usize) -> Self {
        self.spill_page_size = bytes;
        self
    }

    #[must_use]
    pub fn max_sessions(mut self, n: usize) -> Self {
        self.max_sessions = n;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the shared block cache.
    ///
    /// Provide a cache created with [`BlockCache::with_capacity_bytes`]
    /// and shared across vnodes to cap global cache memory usage, the
    /// same way the teacher's [`Config::use_cache`] does for its tree
    /// block cache.
    #[must_use]
    pub fn use_cache(mut self, cache: Arc<BlockCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    #[doc(hidden)]
    pub fn descriptor_table(mut self, descriptor_table: Arc<FileDescriptorTable>) -> Self {
        self.descriptor_table = descriptor_table;
        self
    }

    #[must_use]
    #[doc(hidden)]
    pub fn spill_registry(mut self, spill_registry: Arc<SpillRegistry>) -> Self {
        self.spill_registry = spill_registry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_conversion_exact() {
        assert_eq!(
            Precision::Microseconds.convert_exact(5, Precision::Milliseconds),
            Some(5_000)
        );
        assert_eq!(
            Precision::Milliseconds.convert_exact(5_000, Precision::Microseconds),
            Some(5)
        );
    }

    #[test]
    fn precision_conversion_rejects_lossy_downscale() {
        assert_eq!(Precision::Milliseconds.convert_exact(1_500, Precision::Microseconds), None);
    }

    #[test]
    fn builder_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::new(dir.path()).max_blocks(32).days_per_file(5);
        assert_eq!(cfg.max_blocks, 32);
        assert_eq!(cfg.days_per_file, 5);
        assert_eq!(cfg.default_sliding_hash_capacity, 10_000);
    }
}
