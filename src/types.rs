//! Value types shared by the walker and the orchestrators.
//!
//! Everything here is created fresh from a native query and dropped once the
//! consuming step is done with it; nothing is cached across calls.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};

/// Win32-compatible file attribute bitset.
///
/// The bit values match `FILE_ATTRIBUTE_*` so a Windows backend can pass raw
/// attributes straight through; other backends synthesize the bits they can.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileAttributes(u32);

impl FileAttributes {
    pub const READ_ONLY: Self = Self(0x0000_0001);
    pub const HIDDEN: Self = Self(0x0000_0002);
    pub const SYSTEM: Self = Self(0x0000_0004);
    pub const DIRECTORY: Self = Self(0x0000_0010);
    pub const ARCHIVE: Self = Self(0x0000_0020);
    pub const DEVICE: Self = Self(0x0000_0040);
    pub const NORMAL: Self = Self(0x0000_0080);
    pub const TEMPORARY: Self = Self(0x0000_0100);
    pub const SPARSE_FILE: Self = Self(0x0000_0200);
    pub const REPARSE_POINT: Self = Self(0x0000_0400);
    pub const COMPRESSED: Self = Self(0x0000_0800);
    pub const OFFLINE: Self = Self(0x0000_1000);
    pub const NOT_CONTENT_INDEXED: Self = Self(0x0000_2000);
    pub const ENCRYPTED: Self = Self(0x0000_4000);

    const NAMES: [(Self, &'static str); 14] = [
        (Self::READ_ONLY, "read-only"),
        (Self::HIDDEN, "hidden"),
        (Self::SYSTEM, "system"),
        (Self::DIRECTORY, "directory"),
        (Self::ARCHIVE, "archive"),
        (Self::DEVICE, "device"),
        (Self::NORMAL, "normal"),
        (Self::TEMPORARY, "temporary"),
        (Self::SPARSE_FILE, "sparse"),
        (Self::REPARSE_POINT, "reparse-point"),
        (Self::COMPRESSED, "compressed"),
        (Self::OFFLINE, "offline"),
        (Self::NOT_CONTENT_INDEXED, "not-content-indexed"),
        (Self::ENCRYPTED, "encrypted"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    /// Keep unknown bits; native layers may report attributes we do not name.
    pub const fn from_bits_retain(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Copy of `self` with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub const fn is_read_only(self) -> bool {
        self.contains(Self::READ_ONLY)
    }
}

impl BitOr for FileAttributes {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileAttributes({:#06x}: {})", self.0, self)
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Opaque caller-owned transaction handle.
///
/// The engine threads it into every native call and never looks inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionContext {
    raw: u64,
}

impl TransactionContext {
    pub const fn from_raw(raw: u64) -> Self {
        Self { raw }
    }

    pub const fn as_raw(&self) -> u64 {
        self.raw
    }
}

/// One traversal result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntryInfo {
    /// Absolute path of the entry, in the form the resolver produced for the root.
    pub full_path: PathBuf,
    /// Final path component.
    pub name: String,
    pub is_directory: bool,
    /// Symbolic links, junctions and similar indirection nodes.
    pub is_reparse_point: bool,
    /// Root of another mounted volume.
    pub is_mount_point: bool,
    pub attributes: FileAttributes,
    /// Byte length; always 0 for directories.
    pub size: u64,
}

impl DirectoryEntryInfo {
    pub fn path(&self) -> &Path {
        &self.full_path
    }

    pub fn is_read_only(&self) -> bool {
        self.attributes.is_read_only()
    }
}

/// What kind of step a progress record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressKind {
    DirectoryCreated,
    FileCopied,
    LinkCopied,
    TreeMoved,
}

/// Snapshot handed to the progress callback after each completed entry.
#[derive(Clone, Debug)]
pub struct CopyProgress<'a> {
    pub kind: ProgressKind,
    pub source: &'a Path,
    pub destination: &'a Path,
    /// Bytes of this entry (0 for directories).
    pub entry_bytes: u64,
    /// Entries completed so far in this call, including this one.
    pub entries_processed: u64,
    /// Bytes copied so far in this call, including this entry.
    pub bytes_transferred: u64,
}

/// Returned by a progress callback to keep going or stop before the next entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProgressAction {
    #[default]
    Continue,
    Cancel,
}

/// Result of a top-level copy or move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyMoveOutcome {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    pub succeeded: bool,
    pub is_move: bool,
    pub was_canceled: bool,
    /// 0 on success, `ERROR_REQUEST_ABORTED` (1235) when canceled.
    pub native_error_code: u32,
    pub entries_processed: u64,
    pub bytes_transferred: u64,
}
