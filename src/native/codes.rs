//! Translation from host `io::Error`s to [`NativeCode`]s, plus hint text.
//!
//! Unix errno values are mapped through libc; on Windows the raw Win32 code is
//! already what we want. Errors without an OS code fall back to `ErrorKind`.

use std::io;

use super::{NativeCode, NativeError};

#[cfg(unix)]
fn code_from_os(code: i32) -> NativeCode {
    match code {
        libc::ENOENT => NativeCode::PathNotFound,
        libc::EACCES | libc::EPERM | libc::EISDIR | libc::EROFS => NativeCode::AccessDenied,
        libc::EXDEV => NativeCode::NotSameDevice,
        libc::EBUSY | libc::ETXTBSY => NativeCode::SharingViolation,
        libc::EEXIST => NativeCode::AlreadyExists,
        libc::ENOTEMPTY => NativeCode::DirNotEmpty,
        libc::ENOTDIR => NativeCode::NotADirectory,
        libc::ECANCELED => NativeCode::RequestAborted,
        other => NativeCode::Other(other),
    }
}

#[cfg(windows)]
fn code_from_os(code: i32) -> NativeCode {
    NativeCode::from_raw(code as u32)
}

#[cfg(not(any(unix, windows)))]
fn code_from_os(code: i32) -> NativeCode {
    NativeCode::Other(code)
}

fn code_from_kind(kind: io::ErrorKind) -> NativeCode {
    match kind {
        io::ErrorKind::NotFound => NativeCode::PathNotFound,
        io::ErrorKind::PermissionDenied => NativeCode::AccessDenied,
        io::ErrorKind::AlreadyExists => NativeCode::AlreadyExists,
        io::ErrorKind::DirectoryNotEmpty => NativeCode::DirNotEmpty,
        io::ErrorKind::NotADirectory => NativeCode::NotADirectory,
        io::ErrorKind::CrossesDevices => NativeCode::NotSameDevice,
        io::ErrorKind::ResourceBusy => NativeCode::SharingViolation,
        io::ErrorKind::Interrupted => NativeCode::RequestAborted,
        _ => NativeCode::Other(-1),
    }
}

/// Convert a host error into the engine's native error.
pub fn native_error_from_io(e: &io::Error) -> NativeError {
    match e.raw_os_error() {
        Some(os) => NativeError {
            code: code_from_os(os),
            os_code: Some(os),
        },
        None => NativeError::new(code_from_kind(e.kind())),
    }
}

/// Short actionable hint for a code, appended to user-facing messages.
pub fn hint(code: NativeCode) -> Option<&'static str> {
    match code {
        NativeCode::FileNotFound | NativeCode::PathNotFound => {
            Some("path not found; verify it exists")
        }
        NativeCode::AccessDenied => Some("permission denied; check ownership and write permissions"),
        NativeCode::NotSameDevice => Some("cross-filesystem; atomic rename not possible"),
        NativeCode::SharingViolation => Some("resource busy; another process holds it open"),
        NativeCode::FileExists | NativeCode::AlreadyExists => {
            Some("already exists; remove the target or allow replacing it")
        }
        NativeCode::DirNotEmpty => Some("directory still has entries"),
        NativeCode::NotADirectory => Some("expected a directory but found a file"),
        NativeCode::RequestAborted => Some("operation was canceled"),
        NativeCode::MountPointNotFound => Some("nothing is mounted there"),
        NativeCode::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_fallback_without_os_code() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(native_error_from_io(&err).code, NativeCode::PathNotFound);
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(native_error_from_io(&err).code, NativeCode::AccessDenied);
        let err = io::Error::other("boom");
        assert!(matches!(native_error_from_io(&err).code, NativeCode::Other(_)));
    }

    #[cfg(unix)]
    #[test]
    fn errno_values_map_to_win32_codes() {
        let cases = [
            (libc::ENOENT, NativeCode::PathNotFound),
            (libc::EACCES, NativeCode::AccessDenied),
            (libc::EXDEV, NativeCode::NotSameDevice),
            (libc::EBUSY, NativeCode::SharingViolation),
            (libc::ENOTEMPTY, NativeCode::DirNotEmpty),
            (libc::ENOTDIR, NativeCode::NotADirectory),
        ];
        for (errno, expected) in cases {
            let err = io::Error::from_raw_os_error(errno);
            let native = native_error_from_io(&err);
            assert_eq!(native.code, expected, "errno {errno}");
            assert_eq!(native.os_code, Some(errno));
        }
    }

    #[test]
    fn hints_exist_for_named_codes() {
        assert!(hint(NativeCode::SharingViolation).unwrap().contains("busy"));
        assert!(hint(NativeCode::Other(7)).is_none());
    }
}
