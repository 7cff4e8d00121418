//! Host backend over `std::fs`.
//!
//! Kernel transactions are not available through std; a supplied context is
//! accepted and the call runs untransacted.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::trace;

use super::codes::native_error_from_io;
use super::{
    CopyFileFlags, FileSystem, NativeCode, NativeEntry, NativeError, NativeResult, io_copy, meta,
};
use crate::platform;
use crate::types::{DirectoryEntryInfo, FileAttributes, TransactionContext};

/// [`FileSystem`] over the host operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub const fn new() -> Self {
        Self
    }
}

fn io_err(e: io::Error) -> NativeError {
    native_error_from_io(&e)
}

fn note_tx(op: &'static str, tx: Option<&TransactionContext>) {
    if let Some(tx) = tx {
        trace!(op, tx = tx.as_raw(), "transaction context ignored by host backend");
    }
}

/// Build a listing record from `lstat` data; links report their target's kind.
fn describe(path: &Path, name: &OsStr, lmeta: &fs::Metadata) -> NativeEntry {
    let is_link = lmeta.file_type().is_symlink();
    let is_dir = if is_link {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    } else {
        lmeta.is_dir()
    };
    let attributes = platform::attributes_from_metadata(name, lmeta, is_dir);
    NativeEntry {
        name: name.to_os_string(),
        attributes,
        size: if is_dir { 0 } else { lmeta.len() },
        is_reparse_point: is_link || attributes.contains(FileAttributes::REPARSE_POINT),
        is_mount_point: is_dir && platform::is_mount_point(path, lmeta),
    }
}

/// Canonicalize what exists; keep the final component as given so a link
/// passed as the root is acted on itself rather than on its target.
fn resolve_lenient(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => resolve_existing_prefix(parent).join(name),
        _ => dunce::canonicalize(&absolute).unwrap_or(absolute),
    }
}

fn resolve_existing_prefix(dir: &Path) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(dir) {
        return canonical;
    }
    match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) => resolve_existing_prefix(parent).join(name),
        _ => dir.to_path_buf(),
    }
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path, _is_dir: bool) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Remove whatever sits at `path` without following a link.
fn remove_any(path: &Path, lmeta: &fs::Metadata) -> io::Result<()> {
    if lmeta.is_dir() {
        fs::remove_dir(path)
    } else if lmeta.file_type().is_symlink() && cfg!(windows) && fs::metadata(path)?.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

impl FileSystem for OsFileSystem {
    fn list_children(
        &self,
        dir: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<Vec<NativeEntry>> {
        note_tx("list_children", tx);
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            let lmeta = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    trace!(path = %path.display(), "entry vanished during listing");
                    continue;
                }
                Err(e) => return Err(io_err(e)),
            };
            out.push(describe(&path, &entry.file_name(), &lmeta));
        }
        Ok(out)
    }

    fn query_metadata(
        &self,
        path: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<DirectoryEntryInfo> {
        note_tx("query_metadata", tx);
        let lmeta = fs::symlink_metadata(path).map_err(io_err)?;
        let name = path.file_name().unwrap_or(path.as_os_str());
        let native = describe(path, name, &lmeta);
        let parent = path.parent().unwrap_or(path);
        let mut info = native.into_entry_info(parent);
        info.full_path = path.to_path_buf();
        Ok(info)
    }

    fn create_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        note_tx("create_directory", tx);
        fs::create_dir(path).map_err(io_err)
    }

    fn remove_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        note_tx("remove_directory", tx);
        let lmeta = fs::symlink_metadata(path).map_err(io_err)?;
        if lmeta.file_type().is_symlink() {
            // Directory links go away as links; the target is never touched.
            return remove_any(path, &lmeta).map_err(io_err);
        }
        if !lmeta.is_dir() {
            return Err(NativeError::new(NativeCode::NotADirectory));
        }
        fs::remove_dir(path).map_err(|e| {
            let mut err = io_err(e);
            // Some platforms report a non-empty rmdir as EEXIST.
            if err.code == NativeCode::AlreadyExists {
                err.code = NativeCode::DirNotEmpty;
            }
            err
        })
    }

    fn delete_file(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        note_tx("delete_file", tx);
        fs::remove_file(path).map_err(io_err)
    }

    fn move_entry(
        &self,
        src: &Path,
        dst: &Path,
        replace_existing: bool,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        note_tx("move_entry", tx);
        if !replace_existing && fs::symlink_metadata(dst).is_ok() {
            return Err(NativeError::new(NativeCode::AlreadyExists));
        }
        fs::rename(src, dst).map_err(io_err)
    }

    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        flags: &CopyFileFlags,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<u64> {
        note_tx("copy_file", tx);
        let lmeta = fs::symlink_metadata(src).map_err(io_err)?;
        let existing = fs::symlink_metadata(dst).ok();
        if existing.is_some() && !flags.overwrite {
            return Err(NativeError::new(NativeCode::FileExists));
        }

        if flags.copy_symlink && lmeta.file_type().is_symlink() {
            let target = fs::read_link(src).map_err(io_err)?;
            let target_is_dir = fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false);
            if let Some(old) = existing.as_ref() {
                remove_any(dst, old).map_err(io_err)?;
            }
            create_link(&target, dst, target_is_dir).map_err(io_err)?;
            return Ok(0);
        }

        let src_meta = fs::metadata(src).map_err(io_err)?;
        if src_meta.is_dir() {
            return Err(NativeError::new(NativeCode::AccessDenied));
        }

        let tmp = io_copy::temp_sibling(dst);
        let finish = || -> io::Result<u64> {
            let bytes = io_copy::copy_streaming(src, &tmp)?;
            meta::apply_source_metadata(&src_meta, &tmp, flags.preserve_timestamps)?;
            fs::rename(&tmp, dst)?;
            Ok(bytes)
        };
        finish().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            io_err(e)
        })
    }

    fn set_attributes(
        &self,
        path: &Path,
        attributes: FileAttributes,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        note_tx("set_attributes", tx);
        platform::set_read_only(path, attributes.is_read_only()).map_err(io_err)
    }

    fn unmount_mount_point(
        &self,
        path: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        note_tx("unmount_mount_point", tx);
        platform::unmount(path).map_err(|e| {
            #[cfg(unix)]
            if e.raw_os_error() == Some(libc::EINVAL) {
                return NativeError {
                    code: NativeCode::MountPointNotFound,
                    os_code: e.raw_os_error(),
                };
            }
            io_err(e)
        })
    }

    fn same_volume(
        &self,
        a: &Path,
        b: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<bool> {
        note_tx("same_volume", tx);
        let va = platform::volume_key(a).map_err(io_err)?;
        let vb = platform::volume_key(b).map_err(io_err)?;
        Ok(va == vb)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        resolve_lenient(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_children_reports_kinds_and_sizes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"12345").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let mut children = OsFileSystem.list_children(dir.path(), None).unwrap();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].name, "a.txt");
        assert_eq!(children[0].size, 5);
        assert!(!children[0].is_directory());
        assert!(children[1].is_directory());
        assert_eq!(children[1].size, 0);
    }

    #[test]
    fn listing_missing_directory_is_path_not_found() {
        let dir = tempdir().unwrap();
        let err = OsFileSystem
            .list_children(&dir.path().join("nope"), None)
            .unwrap_err();
        assert!(err.code.is_not_found());
    }

    #[test]
    fn remove_non_empty_directory_reports_dir_not_empty() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("f"), b"x").unwrap();
        let err = OsFileSystem.remove_directory(&sub, None).unwrap_err();
        assert_eq!(err.code, NativeCode::DirNotEmpty);
    }

    #[test]
    fn remove_directory_on_file_reports_not_a_directory() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, b"x").unwrap();
        let err = OsFileSystem.remove_directory(&f, None).unwrap_err();
        assert_eq!(err.code, NativeCode::NotADirectory);
    }

    #[test]
    fn copy_file_refuses_existing_without_overwrite() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        let err = OsFileSystem
            .copy_file(&src, &dst, &CopyFileFlags::default(), None)
            .unwrap_err();
        assert!(err.code.is_already_exists());

        let flags = CopyFileFlags {
            overwrite: true,
            ..Default::default()
        };
        assert_eq!(OsFileSystem.copy_file(&src, &dst, &flags, None).unwrap(), 3);
        assert_eq!(fs::read(&dst).unwrap(), b"new");
    }

    #[test]
    fn create_existing_directory_reports_already_exists() {
        let dir = tempdir().unwrap();
        let err = OsFileSystem.create_directory(dir.path(), None).unwrap_err();
        assert!(err.code.is_already_exists());
    }

    #[test]
    fn resolve_keeps_missing_tail() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("x").join("y");
        let resolved = OsFileSystem.resolve(&missing);
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("x/y"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_reparse_and_removed_as_link() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"x").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let info = OsFileSystem.query_metadata(&link, None).unwrap();
        assert!(info.is_directory);
        assert!(info.is_reparse_point);
        assert_eq!(OsFileSystem.resolve(&link), dunce::canonicalize(dir.path()).unwrap().join("link"));

        OsFileSystem.remove_directory(&link, None).unwrap();
        assert!(!link.exists());
        assert!(target.join("keep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn copy_symlink_recreates_link() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("t.txt");
        fs::write(&target, b"data").unwrap();
        let link = dir.path().join("l");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let out = dir.path().join("l2");

        let flags = CopyFileFlags {
            copy_symlink: true,
            ..Default::default()
        };
        OsFileSystem.copy_file(&link, &out, &flags, None).unwrap();
        assert!(fs::symlink_metadata(&out).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&out).unwrap(), target);
    }

    #[test]
    fn same_volume_for_siblings() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        fs::create_dir(&a).unwrap();
        assert!(OsFileSystem.same_volume(dir.path(), &a, None).unwrap());
    }
}
