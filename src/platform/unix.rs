//! Unix implementations of platform helpers (Linux, macOS and the BSDs).

use super::common_unix::atomic_write_0600;
use crate::types::FileAttributes;
use anyhow::Result;
use std::ffi::{CString, OsStr};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

/// Open log file for appending; set 0600 only when creating a new file.
/// If the file already exists, we preserve its existing permissions to avoid
/// clobbering administrator adjustments (e.g. group-readable for log shipping).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

/// Write config atomically: temp file (0600) + fsync + rename + fsync dir.
pub fn write_config_secure_new_0600(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write_0600(path, contents)
}

pub fn set_dir_mode_0700(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

pub fn set_file_mode_0600(path: &Path) -> io::Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

/// Identifier of the volume holding `path` (device id).
pub fn volume_key(path: &Path) -> io::Result<String> {
    Ok(fs::metadata(path)?.dev().to_string())
}

/// A directory whose device differs from its parent's is the root of a mount.
/// The file-system root itself is never reported.
pub fn is_mount_point(path: &Path, meta: &fs::Metadata) -> bool {
    if !meta.is_dir() || meta.file_type().is_symlink() {
        return false;
    }
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return false;
    };
    match fs::metadata(parent) {
        Ok(parent_meta) => parent_meta.dev() != meta.dev(),
        Err(_) => false,
    }
}

fn c_path(path: &Path) -> io::Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"))
}

/// Detach the file system mounted at `path`. EINVAL means nothing is mounted there.
#[cfg(target_os = "linux")]
pub fn unmount(path: &Path) -> io::Result<()> {
    let c = c_path(path)?;
    // SAFETY: `c` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::umount2(c.as_ptr(), 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn unmount(path: &Path) -> io::Result<()> {
    let c = c_path(path)?;
    // SAFETY: `c` is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::unmount(c.as_ptr(), 0) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Toggle the owner's write bit (read-only means no write bits at all).
pub fn set_read_only(path: &Path, read_only: bool) -> io::Result<()> {
    let mode = fs::metadata(path)?.permissions().mode();
    let new_mode = if read_only { mode & !0o222 } else { mode | 0o200 };
    if new_mode != mode {
        fs::set_permissions(path, fs::Permissions::from_mode(new_mode))?;
    }
    Ok(())
}

/// Synthesize Win32-style attributes from `lstat` metadata.
/// `is_dir` is passed in because for links it describes the link target.
pub fn attributes_from_metadata(name: &OsStr, meta: &fs::Metadata, is_dir: bool) -> FileAttributes {
    let mut attrs = FileAttributes::empty();
    let is_link = meta.file_type().is_symlink();
    if is_dir {
        attrs |= FileAttributes::DIRECTORY;
    }
    if is_link {
        attrs |= FileAttributes::REPARSE_POINT;
    } else if meta.permissions().readonly() {
        attrs |= FileAttributes::READ_ONLY;
    }
    if name.as_bytes().first() == Some(&b'.') {
        attrs |= FileAttributes::HIDDEN;
    }
    if attrs.is_empty() {
        attrs = FileAttributes::NORMAL;
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn preserve_existing_log_file_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, b"hello").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640, "existing permissions should be preserved");
    }

    #[test]
    fn new_log_file_gets_0600() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new_log.txt");
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn atomic_config_write_sets_mode_and_no_temp_leftover() {
        let dir = tempdir().unwrap();
        let cfg = dir.path().join("config.xml");
        write_config_secure_new_0600(&cfg, b"<x/>").unwrap();
        assert_eq!(fs::read(&cfg).unwrap(), b"<x/>");
        let mode = fs::metadata(&cfg).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        for entry in fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(!name.starts_with(".dirtree.config.tmp."), "leftover temp file: {name}");
        }
    }

    #[test]
    fn read_only_toggle_round_trips() {
        let dir = tempdir().unwrap();
        let f = dir.path().join("f");
        fs::write(&f, b"x").unwrap();
        set_read_only(&f, true).unwrap();
        assert!(fs::metadata(&f).unwrap().permissions().readonly());
        set_read_only(&f, false).unwrap();
        assert!(!fs::metadata(&f).unwrap().permissions().readonly());
    }

    #[test]
    fn temp_dir_is_not_a_mount_point_of_its_child() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        let meta = fs::symlink_metadata(&sub).unwrap();
        assert!(!is_mount_point(&sub, &meta));
        assert_eq!(volume_key(dir.path()).unwrap(), volume_key(&sub).unwrap());
    }

    #[test]
    fn attributes_for_hidden_read_only_file() {
        let dir = tempdir().unwrap();
        let f = dir.path().join(".hidden");
        fs::write(&f, b"x").unwrap();
        set_read_only(&f, true).unwrap();
        let meta = fs::symlink_metadata(&f).unwrap();
        let attrs = attributes_from_metadata(OsStr::new(".hidden"), &meta, false);
        assert!(attrs.contains(FileAttributes::HIDDEN | FileAttributes::READ_ONLY));
        assert!(!attrs.contains(FileAttributes::DIRECTORY));
    }
}
