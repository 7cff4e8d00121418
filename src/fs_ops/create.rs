//! Directory creation including missing ancestors.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{DirTreeError, Result};
use crate::native::FileSystem;
use crate::types::TransactionContext;

/// Create `path` and any missing ancestors.
///
/// An existing directory is fine; a file in the way is `NotADirectory`.
pub fn create_directory<F: FileSystem>(
    fs: &F,
    path: impl AsRef<Path>,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    let path = fs.resolve(path.as_ref());
    create_resolved(fs, &path, tx)
}

pub(crate) fn create_resolved<F: FileSystem>(
    fs: &F,
    path: &Path,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    let mut missing: Vec<PathBuf> = Vec::new();
    for p in path.ancestors().filter(|p| !p.as_os_str().is_empty()) {
        match fs.query_metadata(p, tx) {
            Ok(info) if info.is_directory => break,
            Ok(_) => return Err(DirTreeError::NotADirectory(p.to_path_buf())),
            Err(e) if e.code.is_not_found() => missing.push(p.to_path_buf()),
            Err(e) => return Err(DirTreeError::from_native(p, "query", e)),
        }
    }

    for dir in missing.iter().rev() {
        create_one(fs, dir, tx)?;
    }
    Ok(())
}

/// Create exactly `dir`, accepting a directory that appeared concurrently.
pub(crate) fn create_one<F: FileSystem>(
    fs: &F,
    dir: &Path,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    match fs.create_directory(dir, tx) {
        Ok(()) => {
            debug!(path = %dir.display(), "created directory");
            Ok(())
        }
        Err(e) if e.code.is_already_exists() => match fs.query_metadata(dir, tx) {
            Ok(info) if info.is_directory => Ok(()),
            Ok(_) => Err(DirTreeError::NotADirectory(dir.to_path_buf())),
            Err(e) => Err(DirTreeError::from_native(dir, "query", e)),
        },
        Err(e) => Err(DirTreeError::from_native(dir, "create directory", e)),
    }
}
