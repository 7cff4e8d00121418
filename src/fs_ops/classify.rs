//! Classification of `remove_directory` failures.
//!
//! Pure: takes the native code plus what the orchestrator knows about the
//! node, returns what to do next. No I/O happens here.

use std::path::Path;

use crate::errors::DirTreeError;
use crate::native::{NativeCode, NativeError};

/// What the orchestrator knows when a removal fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoveContext {
    /// Non-recursive removal that must not touch a populated directory.
    pub require_empty: bool,
    pub continue_if_missing: bool,
    pub ignore_read_only: bool,
    /// The directory currently carries the read-only attribute.
    pub read_only: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryAction {
    /// Pause for the policy delay, then try again.
    Immediately,
    /// Drop the read-only attribute, then try again.
    ClearReadOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FatalKind {
    DirectoryNotEmpty,
    NotADirectory,
    NotFound,
    SharingViolation,
    ReadOnly,
    AccessDenied,
    Native,
}

impl FatalKind {
    pub fn into_error(self, path: &Path, error: NativeError) -> DirTreeError {
        let path = path.to_path_buf();
        match self {
            FatalKind::DirectoryNotEmpty => DirTreeError::DirectoryNotEmpty(path),
            FatalKind::NotADirectory => DirTreeError::NotADirectory(path),
            FatalKind::NotFound => DirTreeError::NotFound(path),
            FatalKind::SharingViolation => DirTreeError::SharingViolation(path),
            FatalKind::ReadOnly => DirTreeError::ReadOnly(path),
            FatalKind::AccessDenied => DirTreeError::AccessDenied(path),
            FatalKind::Native => DirTreeError::Native {
                path,
                op: "remove directory",
                error,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    TreatAsSuccess,
    RetryBounded(RetryAction),
    Fatal(FatalKind),
}

pub fn classify_remove_error(code: NativeCode, ctx: &RemoveContext) -> Disposition {
    match code {
        NativeCode::DirNotEmpty if ctx.require_empty => Disposition::Fatal(FatalKind::DirectoryNotEmpty),
        NativeCode::DirNotEmpty => Disposition::RetryBounded(RetryAction::Immediately),
        NativeCode::NotADirectory => Disposition::Fatal(FatalKind::NotADirectory),
        NativeCode::FileNotFound | NativeCode::PathNotFound if ctx.continue_if_missing => {
            Disposition::TreatAsSuccess
        }
        NativeCode::FileNotFound | NativeCode::PathNotFound => Disposition::Fatal(FatalKind::NotFound),
        NativeCode::SharingViolation => Disposition::Fatal(FatalKind::SharingViolation),
        NativeCode::AccessDenied => match (ctx.read_only, ctx.ignore_read_only) {
            (true, true) => Disposition::RetryBounded(RetryAction::ClearReadOnly),
            (true, false) => Disposition::Fatal(FatalKind::ReadOnly),
            (false, _) => Disposition::Fatal(FatalKind::AccessDenied),
        },
        _ => Disposition::Fatal(FatalKind::Native),
    }
}
