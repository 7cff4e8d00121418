//! Streaming file copy used by the host backend.
//!
//! - The destination is created with `create_new`, so an existing file is never clobbered;
//!   callers that want replacement copy to a temporary sibling and rename it into place.
//! - Linux tries `copy_file_range` first and falls back to buffered I/O when unsupported.
//! - The source is read once to EOF; growth after the copy started is not included.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

const BUF_SIZE: usize = 1024 * 1024;

/// Copy `src` into a newly created `dst`. Returns the number of bytes written.
pub(super) fn copy_streaming(src: &Path, dst: &Path) -> io::Result<u64> {
    let src_f = File::open(src)?;
    let dst_f = OpenOptions::new().write(true).create_new(true).open(dst)?;

    #[cfg(target_os = "linux")]
    {
        if let Some(bytes) = copy_in_kernel(&src_f, &dst_f)? {
            return Ok(bytes);
        }
    }

    let mut reader = BufReader::with_capacity(BUF_SIZE, src_f);
    let mut writer = BufWriter::with_capacity(BUF_SIZE, dst_f);
    let bytes = io::copy(&mut reader, &mut writer)?;
    writer.flush()?;
    Ok(bytes)
}

/// `Ok(None)` means the kernel refused before any byte moved; stream instead.
#[cfg(target_os = "linux")]
fn copy_in_kernel(src: &File, dst: &File) -> io::Result<Option<u64>> {
    use std::os::unix::io::AsRawFd;

    const CHUNK: usize = 16 * 1024 * 1024;
    let mut total: u64 = 0;
    loop {
        // SAFETY: both descriptors are open for the duration of the call and the
        // offset pointers are null, so the kernel uses and advances the file offsets.
        let rc = unsafe {
            libc::copy_file_range(
                src.as_raw_fd(),
                std::ptr::null_mut(),
                dst.as_raw_fd(),
                std::ptr::null_mut(),
                CHUNK,
                0,
            )
        };
        if rc > 0 {
            total += rc as u64;
            continue;
        }
        if rc == 0 {
            return Ok(Some(total));
        }
        let err = io::Error::last_os_error();
        let unsupported = matches!(
            err.raw_os_error(),
            Some(code) if code == libc::EXDEV
                || code == libc::ENOSYS
                || code == libc::EINVAL
                || code == libc::EPERM
                || code == libc::EOPNOTSUPP
        );
        if total == 0 && unsupported {
            return Ok(None);
        }
        return Err(err);
    }
}

/// Hidden sibling of `dst` to copy into before the final rename.
pub(super) fn temp_sibling(dst: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = format!(".dirtree.{pid}.{nanos}.{seq}.tmp");
    dst.parent().unwrap_or_else(|| Path::new(".")).join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn temp_siblings_are_unique_within_a_process() {
        let dst = Path::new("/tmp/out/file.bin");
        let a = temp_sibling(dst);
        let b = temp_sibling(dst);
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(Path::new("/tmp/out")));
    }

    #[test]
    fn copy_small_file_ok() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, b"hello world").unwrap();

        let n = copy_streaming(&src, &dst).unwrap();
        assert_eq!(n, 11);
        assert_eq!(fs::read(&dst).unwrap(), b"hello world");
    }

    #[test]
    fn copy_zero_length_ok() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("empty");
        let dst = dir.path().join("out");
        File::create(&src).unwrap();

        assert_eq!(copy_streaming(&src, &dst).unwrap(), 0);
        assert_eq!(fs::metadata(&dst).unwrap().len(), 0);
    }

    #[test]
    fn refuses_existing_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::write(&src, b"data").unwrap();
        fs::write(&dst, b"x").unwrap();

        let err = copy_streaming(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dst).unwrap(), b"x");
    }

    #[test]
    fn multi_buffer_copy_is_exact() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("big.bin");
        let dst = dir.path().join("big.out");
        let size = 2 * BUF_SIZE + 123;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();

        assert_eq!(copy_streaming(&src, &dst).unwrap() as usize, size);
        assert_eq!(fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn temp_sibling_stays_in_destination_dir() {
        let dst = Path::new("/some/dir/file.txt");
        let tmp = temp_sibling(dst);
        assert_eq!(tmp.parent(), Some(Path::new("/some/dir")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".dirtree.") && name.ends_with(".tmp"));
    }
}
