// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Day-file naming and the `pread`-style read helper shared by the
//! header index reader (§4.B) and the block codec (§4.A). This crate
//! never writes day-files (write path is an external collaborator, see
//! spec.md §1/§6), so unlike the teacher's `file.rs` there is no
//! `rewrite_atomic`/`fsync_directory` here.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// Fixed magic prefix at the start of every header file.
pub const MAGIC_BYTES: [u8; 4] = [b'T', b'V', b'D', 1];

/// Length in bytes of the fixed header prefix before the offset table
/// (spec.md §6.1 `FIXED_PREFIX`).
pub const TSDB_FILE_HEADER_LEN: usize = 512;

/// The three files making up a day-file (spec.md §3/§6.1).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum FileKind {
    /// Block-index segments: offset table, `SCompInfo`, `SCompBlock[]`.
    Head,
    /// Committed column payloads.
    Data,
    /// The still-being-written tail segment of the newest file.
    Last,
}

impl FileKind {
    fn extension(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Data => "data",
            Self::Last => "last",
        }
    }
}

/// Builds the path `{dataRoot}/vnode{vid}/db/v{vid}f{fileId}.{kind}`.
#[must_use]
pub fn day_file_path(data_root: &Path, vnode_id: u32, file_id: i32, kind: FileKind) -> PathBuf {
    data_root
        .join(format!("vnode{vnode_id}"))
        .join("db")
        .join(format!("v{vnode_id}f{file_id}.{}", kind.extension()))
}

/// Reads exactly `size` bytes at `offset` from `file`, without disturbing
/// any other reader's seek position (the runtime owns one FD triple per
/// query, so a plain seek+`read_exact` is race-free within that query).
pub fn read_exact_at(file: &mut File, offset: u64, size: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;

    let mut buf = vec![0u8; size];
    file.read_exact(&mut buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("short read at {offset}: wanted {size} bytes"),
            )
        } else {
            e
        }
    })?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_file_naming() {
        let root = Path::new("/data");
        assert_eq!(
            day_file_path(root, 3, 42, FileKind::Head),
            PathBuf::from("/data/vnode3/db/v3f42.head")
        );
        assert_eq!(
            day_file_path(root, 3, 42, FileKind::Data),
            PathBuf::from("/data/vnode3/db/v3f42.data")
        );
        assert_eq!(
            day_file_path(root, 3, 42, FileKind::Last),
            PathBuf::from("/data/vnode3/db/v3f42.last")
        );
    }
}
