// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::path::{Path, PathBuf};

/// Resolves `path` to an absolute path without requiring it to exist.
#[allow(clippy::module_name_repetitions)]
pub fn absolute_path<P: AsRef<Path>>(path: P) -> PathBuf {
    // NOTE: Not sure if this can even fail realistically.
    #[allow(clippy::expect_used)]
    std::path::absolute(path.as_ref()).expect("should be absolute path")
}
