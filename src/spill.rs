// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Window-engine spill buffer (spec.md §4.H "Compaction/spill to
//! fixed-size pages").
//!
//! When too many windows are open at once to keep every partial result
//! in memory (spec.md §7 "Too many concurrent windows"), the least
//! recently touched pages are spilled. The backing store is a small
//! trait so unit tests can substitute an in-memory `Vec<u8>` instead of
//! a real file-backed growable region; the only production backend uses
//! `ftruncate`-then-`mmap` growth the way a storage engine's WAL/segment
//! growth does, kept behind this seam rather than hardcoded.

use std::io::{Seek, SeekFrom, Write};

/// A fixed-page-size growable byte store.
pub trait SpillBacking: Send + Sync {
    /// Writes `page` bytes at `page_index * page_len`, growing the
    /// backing store if needed.
    ///
    /// # Errors
    ///
    /// `Error::NoDiskSpace` if growth fails.
    fn write_page(&mut self, page_index: u64, page: &[u8]) -> crate::Result<()>;

    /// Reads exactly `page_len` bytes from `page_index * page_len`.
    ///
    /// # Errors
    ///
    /// `Error::Io` if the page was never written.
    fn read_page(&mut self, page_index: u64, page_len: usize) -> crate::Result<Vec<u8>>;
}

/// File-backed spill region, grown with `set_len` (the portable
/// equivalent of `ftruncate`) as pages past the current end are
/// written.
pub struct FileBacking {
    file: std::fs::File,
}

impl FileBacking {
    /// # Errors
    ///
    /// Propagates the `tempfile` creation I/O error.
    pub fn new_temp() -> crate::Result<Self> {
        Ok(Self { file: tempfile::tempfile()? })
    }
}

impl SpillBacking for FileBacking {
    fn write_page(&mut self, page_index: u64, page: &[u8]) -> crate::Result<()> {
        let offset = page_index * page.len() as u64;
        let required_len = offset + page.len() as u64;

        let current_len = self.file.metadata()?.len();
        if required_len > current_len {
            self.file.set_len(required_len).map_err(|_| crate::Error::NoDiskSpace)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page)?;
        Ok(())
    }

    fn read_page(&mut self, page_index: u64, page_len: usize) -> crate::Result<Vec<u8>> {
        let offset = page_index * page_len as u64;
        crate::file::read_exact_at(&mut self.file, offset, page_len).map_err(Into::into)
    }
}

/// In-memory backing for tests: a `Vec<u8>` growing page by page.
#[derive(Default)]
pub struct MemoryBacking {
    pages: Vec<Vec<u8>>,
}

impl SpillBacking for MemoryBacking {
    fn write_page(&mut self, page_index: u64, page: &[u8]) -> crate::Result<()> {
        let idx = page_index as usize;
        if idx >= self.pages.len() {
            self.pages.resize(idx + 1, Vec::new());
        }
        self.pages[idx] = page.to_vec();
        Ok(())
    }

    fn read_page(&mut self, page_index: u64, page_len: usize) -> crate::Result<Vec<u8>> {
        self.pages
            .get(page_index as usize)
            .cloned()
            .filter(|p| p.len() == page_len)
            .ok_or_else(|| {
                crate::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "spill page never written",
                ))
            })
    }
}

/// One window set's spill area: a page-indexed region plus the page
/// size it was configured with (spec.md §4.H).
pub struct SpillArea {
    backing: Box<dyn SpillBacking>,
    page_size: usize,
}

impl SpillArea {
    #[must_use]
    pub fn new(backing: Box<dyn SpillBacking>, page_size: usize) -> Self {
        Self { backing, page_size }
    }

    /// # Errors
    ///
    /// `Error::NoDiskSpace` if growth fails.
    pub fn spill(&mut self, page_index: u64, data: &[u8]) -> crate::Result<()> {
        let mut page = vec![0u8; self.page_size];
        let n = data.len().min(self.page_size);
        page[..n].copy_from_slice(&data[..n]);
        self.backing.write_page(page_index, &page)
    }

    /// # Errors
    ///
    /// `Error::Io` if the page was never spilled.
    pub fn restore(&mut self, page_index: u64) -> crate::Result<Vec<u8>> {
        self.backing.read_page(page_index, self.page_size)
    }
}

/// Process-wide registry of per-query spill areas (spec.md §5 "shared,
/// process-wide"), analogous to `Config`'s shared cache/descriptor
/// table handles.
#[derive(Default)]
pub struct SpillRegistry {
    areas: std::sync::Mutex<rustc_hash::FxHashMap<u64, SpillArea>>,
}

impl SpillRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new spill area for query session `session_id`,
    /// replacing any area already registered under that id.
    pub fn register(&self, session_id: u64, page_size: usize) {
        let area = SpillArea::new(Box::new(MemoryBacking::default()), page_size);
        self.areas.lock().expect("lock poisoned").insert(session_id, area);
    }

    /// Registers a file-backed spill area. Fallible because opening the
    /// backing temp file can fail (`Error::Io`).
    ///
    /// # Errors
    ///
    /// Propagates `FileBacking::new_temp`'s error.
    pub fn register_file_backed(&self, session_id: u64, page_size: usize) -> crate::Result<()> {
        let area = SpillArea::new(Box::new(FileBacking::new_temp()?), page_size);
        self.areas.lock().expect("lock poisoned").insert(session_id, area);
        Ok(())
    }

    pub fn unregister(&self, session_id: u64) {
        self.areas.lock().expect("lock poisoned").remove(&session_id);
    }

    pub fn with_area<R>(&self, session_id: u64, f: impl FnOnce(&mut SpillArea) -> R) -> Option<R> {
        self.areas.lock().expect("lock poisoned").get_mut(&session_id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backing_round_trips() {
        let mut area = SpillArea::new(Box::new(MemoryBacking::default()), 16);
        area.spill(3, b"hello").unwrap();
        let page = area.restore(3).unwrap();
        assert_eq!(&page[..5], b"hello");
        assert_eq!(page.len(), 16);
    }

    #[test]
    fn restore_before_spill_is_an_error() {
        let mut area = SpillArea::new(Box::new(MemoryBacking::default()), 16);
        assert!(area.restore(0).is_err());
    }

    #[test]
    fn registry_round_trips_through_session_id() {
        let registry = SpillRegistry::new();
        registry.register(1, 16);
        registry.with_area(1, |area| area.spill(0, b"data").unwrap()).unwrap();
        let page = registry.with_area(1, |area| area.restore(0).unwrap()).unwrap();
        assert_eq!(&page[..4], b"data");
        registry.unregister(1);
        assert!(registry.with_area(1, |area| area.restore(0)).is_none());
    }

    #[test]
    fn file_backing_grows_and_round_trips() {
        let mut area = SpillArea::new(Box::new(FileBacking::new_temp().unwrap()), 8);
        area.spill(5, b"abcdefg").unwrap();
        let page = area.restore(5).unwrap();
        assert_eq!(&page[..7], b"abcdefg");
    }
}
