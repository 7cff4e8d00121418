//! Native boundary.
//!
//! The engine never touches `std::fs` directly: every listing, create, remove,
//! move and copy goes through [`FileSystem`], and every failure comes back as a
//! [`NativeError`] carrying a Win32-compatible [`NativeCode`]. The orchestrators
//! interpret those codes; they never see raw `io::Error`s.
//!
//! [`OsFileSystem`] is the host implementation.

mod codes;
mod io_copy;
mod meta;
mod os;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::{DirectoryEntryInfo, FileAttributes, TransactionContext};

pub use codes::{hint, native_error_from_io};
pub use os::OsFileSystem;

/// Native status codes the engine distinguishes.
///
/// Values follow Win32 numbering so outcomes stay comparable across backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeCode {
    /// ERROR_FILE_NOT_FOUND (2)
    FileNotFound,
    /// ERROR_PATH_NOT_FOUND (3)
    PathNotFound,
    /// ERROR_ACCESS_DENIED (5)
    AccessDenied,
    /// ERROR_NOT_SAME_DEVICE (17)
    NotSameDevice,
    /// ERROR_SHARING_VIOLATION (32)
    SharingViolation,
    /// ERROR_FILE_EXISTS (80)
    FileExists,
    /// ERROR_DIR_NOT_EMPTY (145)
    DirNotEmpty,
    /// ERROR_ALREADY_EXISTS (183)
    AlreadyExists,
    /// ERROR_DIRECTORY (267): the path is not a directory.
    NotADirectory,
    /// ERROR_REQUEST_ABORTED (1235)
    RequestAborted,
    /// ERROR_NOT_A_REPARSE_POINT (4390): nothing mounted at the path.
    MountPointNotFound,
    /// Anything else, with the raw OS code when one exists.
    Other(i32),
}

impl NativeCode {
    pub const fn raw(self) -> u32 {
        match self {
            NativeCode::FileNotFound => 2,
            NativeCode::PathNotFound => 3,
            NativeCode::AccessDenied => 5,
            NativeCode::NotSameDevice => 17,
            NativeCode::SharingViolation => 32,
            NativeCode::FileExists => 80,
            NativeCode::DirNotEmpty => 145,
            NativeCode::AlreadyExists => 183,
            NativeCode::NotADirectory => 267,
            NativeCode::RequestAborted => 1235,
            NativeCode::MountPointNotFound => 4390,
            NativeCode::Other(code) => code as u32,
        }
    }

    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            2 => NativeCode::FileNotFound,
            3 => NativeCode::PathNotFound,
            5 => NativeCode::AccessDenied,
            17 => NativeCode::NotSameDevice,
            32 => NativeCode::SharingViolation,
            80 => NativeCode::FileExists,
            145 => NativeCode::DirNotEmpty,
            183 => NativeCode::AlreadyExists,
            267 => NativeCode::NotADirectory,
            1235 => NativeCode::RequestAborted,
            4390 => NativeCode::MountPointNotFound,
            other => NativeCode::Other(other as i32),
        }
    }

    pub const fn is_not_found(self) -> bool {
        matches!(self, NativeCode::FileNotFound | NativeCode::PathNotFound)
    }

    pub const fn is_already_exists(self) -> bool {
        matches!(self, NativeCode::FileExists | NativeCode::AlreadyExists)
    }
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NativeCode::FileNotFound => "file not found",
            NativeCode::PathNotFound => "path not found",
            NativeCode::AccessDenied => "access denied",
            NativeCode::NotSameDevice => "not same device",
            NativeCode::SharingViolation => "sharing violation",
            NativeCode::FileExists | NativeCode::AlreadyExists => "already exists",
            NativeCode::DirNotEmpty => "directory not empty",
            NativeCode::NotADirectory => "not a directory",
            NativeCode::RequestAborted => "request aborted",
            NativeCode::MountPointNotFound => "mount point not found",
            NativeCode::Other(_) => "native error",
        };
        write!(f, "{} (code {})", name, self.raw())
    }
}

/// A failed native call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeError {
    pub code: NativeCode,
    /// OS error as reported by the platform, when there was one.
    pub os_code: Option<i32>,
}

impl NativeError {
    pub const fn new(code: NativeCode) -> Self {
        Self { code, os_code: None }
    }
}

impl From<NativeCode> for NativeError {
    fn from(code: NativeCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(os) = self.os_code {
            write!(f, " [os code: {os}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for NativeError {}

pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// One child as reported by [`FileSystem::list_children`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeEntry {
    pub name: OsString,
    pub attributes: FileAttributes,
    pub size: u64,
    pub is_reparse_point: bool,
    pub is_mount_point: bool,
}

impl NativeEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }

    /// Promote to a full entry rooted at `parent`.
    pub fn into_entry_info(self, parent: &Path) -> DirectoryEntryInfo {
        let is_directory = self.is_directory();
        let full_path = parent.join(&self.name);
        DirectoryEntryInfo {
            name: self.name.to_string_lossy().into_owned(),
            full_path,
            is_directory,
            is_reparse_point: self.is_reparse_point,
            is_mount_point: self.is_mount_point,
            attributes: self.attributes,
            size: if is_directory { 0 } else { self.size },
        }
    }
}

/// Flags for [`FileSystem::copy_file`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyFileFlags {
    /// Replace an existing destination instead of failing with `FileExists`.
    pub overwrite: bool,
    /// Recreate a link at the destination instead of copying its target.
    pub copy_symlink: bool,
    /// Carry access and modification times over to the destination.
    pub preserve_timestamps: bool,
}

/// Per-entry file-system primitives the engine is built on.
///
/// None of these recurse. Each call is independent and blocking.
pub trait FileSystem {
    /// Immediate children of `dir`, one batch per call.
    fn list_children(
        &self,
        dir: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<Vec<NativeEntry>>;

    /// Metadata for `path` without following a final link.
    fn query_metadata(
        &self,
        path: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<DirectoryEntryInfo>;

    /// Create exactly one directory; the parent must exist.
    fn create_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()>;

    /// Remove one empty directory, or a directory link without touching its target.
    fn remove_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()>;

    fn delete_file(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()>;

    /// Rename `src` to `dst` as one operation.
    fn move_entry(
        &self,
        src: &Path,
        dst: &Path,
        replace_existing: bool,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()>;

    /// Copy one file (or link when `flags.copy_symlink`). Returns bytes written.
    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        flags: &CopyFileFlags,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<u64>;

    fn set_attributes(
        &self,
        path: &Path,
        attributes: FileAttributes,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()>;

    /// Detach the volume mounted at `path`. Nothing mounted reports `MountPointNotFound`.
    fn unmount_mount_point(&self, path: &Path, tx: Option<&TransactionContext>)
    -> NativeResult<()>;

    /// Whether two existing paths live on the same volume.
    fn same_volume(&self, a: &Path, b: &Path, tx: Option<&TransactionContext>)
    -> NativeResult<bool>;

    /// Canonical absolute form of `path`. The engine treats the result as opaque.
    fn resolve(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn list_children(
        &self,
        dir: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<Vec<NativeEntry>> {
        (**self).list_children(dir, tx)
    }

    fn query_metadata(
        &self,
        path: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<DirectoryEntryInfo> {
        (**self).query_metadata(path, tx)
    }

    fn create_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        (**self).create_directory(path, tx)
    }

    fn remove_directory(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        (**self).remove_directory(path, tx)
    }

    fn delete_file(&self, path: &Path, tx: Option<&TransactionContext>) -> NativeResult<()> {
        (**self).delete_file(path, tx)
    }

    fn move_entry(
        &self,
        src: &Path,
        dst: &Path,
        replace_existing: bool,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        (**self).move_entry(src, dst, replace_existing, tx)
    }

    fn copy_file(
        &self,
        src: &Path,
        dst: &Path,
        flags: &CopyFileFlags,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<u64> {
        (**self).copy_file(src, dst, flags, tx)
    }

    fn set_attributes(
        &self,
        path: &Path,
        attributes: FileAttributes,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        (**self).set_attributes(path, attributes, tx)
    }

    fn unmount_mount_point(
        &self,
        path: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<()> {
        (**self).unmount_mount_point(path, tx)
    }

    fn same_volume(
        &self,
        a: &Path,
        b: &Path,
        tx: Option<&TransactionContext>,
    ) -> NativeResult<bool> {
        (**self).same_volume(a, b, tx)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        (**self).resolve(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes_round_trip_for_named_variants() {
        for code in [
            NativeCode::FileNotFound,
            NativeCode::PathNotFound,
            NativeCode::AccessDenied,
            NativeCode::NotSameDevice,
            NativeCode::SharingViolation,
            NativeCode::FileExists,
            NativeCode::DirNotEmpty,
            NativeCode::AlreadyExists,
            NativeCode::NotADirectory,
            NativeCode::RequestAborted,
            NativeCode::MountPointNotFound,
        ] {
            assert_eq!(NativeCode::from_raw(code.raw()), code);
        }
        assert_eq!(NativeCode::from_raw(9999), NativeCode::Other(9999));
    }

    #[test]
    fn entry_info_zeroes_directory_size() {
        let entry = NativeEntry {
            name: "sub".into(),
            attributes: FileAttributes::DIRECTORY,
            size: 4096,
            is_reparse_point: false,
            is_mount_point: false,
        };
        let info = entry.into_entry_info(Path::new("/root"));
        assert_eq!(info.full_path, PathBuf::from("/root/sub"));
        assert_eq!(info.size, 0);
        assert!(info.is_directory);
    }
}
