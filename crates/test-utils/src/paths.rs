//! Scratch directories for tests that write files.

use std::path::PathBuf;

use tempfile::TempDir;

/// Fresh temporary directory, removed when the returned guard drops.
///
/// The name starts with `prefix` to make leftovers easy to attribute.
pub fn scratch_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("create scratch directory")
}

/// Subdirectory `name` of `dir`, created if missing.
pub fn scratch_subdir(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::create_dir_all(&path).expect("create scratch subdirectory");
    path
}
