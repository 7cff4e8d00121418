//! Windows implementations of platform helpers (best-effort, minimal ACL awareness).
//!
//! Notes:
//! - Windows lacks POSIX mode semantics; we do not attempt ACL management here.
//! - Config writes are done via temp + rename to be atomic.
//! - Volume and mount-point queries go through the Win32 volume APIs.

use crate::types::FileAttributes;
use anyhow::{Result, bail};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::MetadataExt;
use std::path::{Path, PathBuf};

use windows_sys::Win32::Storage::FileSystem::{
    DeleteVolumeMountPointW, GetVolumeNameForVolumeMountPointW, GetVolumePathNameW,
};

const MAX_VOLUME_PATH: usize = 32 * 1024;

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Write a new config file atomically (create_new) using a temp file + rename.
/// Fails if the target already exists.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    if path.exists() {
        bail!("Config file already exists: {}", path.display());
    }
    let tmp = tmp_sibling_name(path);
    let mut f = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    f.write_all(contents)?;
    f.sync_all()?;
    drop(f);
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// No-op on Windows; POSIX-style directory modes are not applicable.
pub fn set_dir_mode_0700(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// No-op on Windows; POSIX-style file modes are not applicable.
pub fn set_file_mode_0600(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn wide(path: &Path) -> Vec<u16> {
    path.as_os_str().encode_wide().chain(once(0)).collect()
}

/// Volume mount points are addressed with a trailing backslash.
fn wide_with_trailing_sep(path: &Path) -> Vec<u16> {
    let mut w: Vec<u16> = path.as_os_str().encode_wide().collect();
    if w.last() != Some(&(b'\\' as u16)) {
        w.push(b'\\' as u16);
    }
    w.push(0);
    w
}

fn from_wide(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}

/// Volume root holding `path`, lower-cased so comparisons ignore case.
pub fn volume_key(path: &Path) -> io::Result<String> {
    let input = wide(path);
    let mut buf = vec![0u16; MAX_VOLUME_PATH];
    // SAFETY: `input` is NUL-terminated and `buf` is writable for its full length.
    let ok = unsafe { GetVolumePathNameW(input.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(from_wide(&buf).to_lowercase())
}

/// A directory is a mount point when it carries a volume GUID name of its own.
pub fn is_mount_point(path: &Path, meta: &fs::Metadata) -> bool {
    let attrs = FileAttributes::from_bits_retain(meta.file_attributes());
    if !attrs.contains(FileAttributes::DIRECTORY | FileAttributes::REPARSE_POINT) {
        return false;
    }
    let input = wide_with_trailing_sep(path);
    let mut buf = vec![0u16; 64];
    // SAFETY: `input` is NUL-terminated and `buf` is writable for its full length.
    let ok = unsafe {
        GetVolumeNameForVolumeMountPointW(input.as_ptr(), buf.as_mut_ptr(), buf.len() as u32)
    };
    ok != 0
}

/// Remove the volume mount point at `path`. ERROR_NOT_A_REPARSE_POINT means nothing is mounted.
pub fn unmount(path: &Path) -> io::Result<()> {
    let input = wide_with_trailing_sep(path);
    // SAFETY: `input` is NUL-terminated and lives across the call.
    let ok = unsafe { DeleteVolumeMountPointW(input.as_ptr()) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn set_read_only(path: &Path, read_only: bool) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if perms.readonly() != read_only {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(read_only);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Raw Win32 attributes; `is_dir` only matters for links whose target we resolved.
pub fn attributes_from_metadata(_name: &OsStr, meta: &fs::Metadata, is_dir: bool) -> FileAttributes {
    let mut attrs = FileAttributes::from_bits_retain(meta.file_attributes());
    if is_dir {
        attrs |= FileAttributes::DIRECTORY;
    }
    attrs
}

fn tmp_sibling_name(target: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let name = format!(".dirtree.config.tmp.{pid}.{nanos}");
    target.parent().unwrap_or_else(|| Path::new(".")).join(name)
}
