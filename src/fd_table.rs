// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! File-descriptor cache for day-file triples (spec.md §5: "only one
//! day-file triple open at a time per query").
//!
//! Opening a `.head`/`.data`/`.last` triple means three `open(2)` calls;
//! a query that walks many tables against the same file should not pay
//! that cost per table. This mirrors the teacher's descriptor table: a
//! small LRU of already-open files keyed by path, shared process-wide.

use crate::file::FileKind;
use quick_cache::sync::Cache as QuickCache;
use quick_cache::UnitWeighter;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Eq, PartialEq, std::hash::Hash, Clone)]
struct Key {
    vnode_id: u32,
    file_id: i32,
    kind: FileKind,
}

/// Shared, reopenable handle to one day-file. `File` doesn't implement
/// `Clone`, so entries hold an `Arc<File>`; callers needing exclusive
/// seeks should `try_clone` or serialize access externally (the query
/// engine only ever reads, via `read_exact_at`, so shared access is
/// safe).
pub struct FileDescriptorTable {
    table: QuickCache<Key, Arc<File>, UnitWeighter, rustc_hash::FxBuildHasher>,
    data_root: PathBuf,
}

impl FileDescriptorTable {
    #[must_use]
    pub fn new(data_root: PathBuf, capacity: usize) -> Self {
        #[allow(clippy::expect_used)]
        let opts = quick_cache::OptionsBuilder::new()
            .weight_capacity(capacity as u64)
            .estimated_items_capacity(capacity)
            .build()
            .expect("cache options should be valid");

        #[allow(clippy::default_trait_access)]
        let table = QuickCache::with_options(
            opts,
            UnitWeighter,
            Default::default(),
            quick_cache::sync::DefaultLifecycle::default(),
        );

        Self { table, data_root }
    }

    /// Returns an already-open handle, or opens and caches one.
    ///
    /// # Errors
    ///
    /// Propagates the `std::fs::File::open` I/O error.
    pub fn access(&self, vnode_id: u32, file_id: i32, kind: FileKind) -> crate::Result<Arc<File>> {
        let key = Key { vnode_id, file_id, kind };

        if let Some(file) = self.table.get(&key) {
            return Ok(file);
        }

        let path = crate::file::day_file_path(&self.data_root, vnode_id, file_id, kind);
        let file = Arc::new(File::open(&path)?);
        self.table.insert(key, file.clone());
        Ok(file)
    }

    /// Evicts a day-file triple's cached handles, e.g. after it is
    /// merged away by the write path (spec.md §7 "File discarded
    /// mid-query").
    pub fn evict(&self, vnode_id: u32, file_id: i32) {
        for kind in [FileKind::Head, FileKind::Data, FileKind::Last] {
            self.table.remove(&Key { vnode_id, file_id, kind });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::file::day_file_path(dir.path(), 1, 7, FileKind::Head);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::File::create(&path).unwrap().write_all(b"hello").unwrap();
        dir
    }

    #[test]
    fn opens_and_reuses_handle() {
        let dir = setup();
        let table = FileDescriptorTable::new(dir.path().to_path_buf(), 8);

        let a = table.access(1, 7, FileKind::Head).unwrap();
        let b = table.access(1, 7, FileKind::Head).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn evict_drops_all_three_kinds() {
        let dir = setup();
        let table = FileDescriptorTable::new(dir.path().to_path_buf(), 8);
        let _ = table.access(1, 7, FileKind::Head).unwrap();
        table.evict(1, 7);
        assert!(table.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = FileDescriptorTable::new(dir.path().to_path_buf(), 8);
        assert!(table.access(1, 99, FileKind::Head).is_err());
    }
}
