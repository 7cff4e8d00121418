//! Recursive directory deletion.
//!
//! Each node goes through Resolve, MountCheck, RecurseChildren and Remove:
//! - Resolve re-queries the node; nothing from an earlier listing is trusted.
//! - A mount point is unmounted first; "nothing mounted" counts as done.
//! - Links and junctions are removed as leaves, their targets are never entered.
//! - Removal failures go through [`classify_remove_error`]; retries are bounded
//!   by [`RetryPolicy`].
//!
//! The first fatal error aborts the whole delete. Whatever was already removed
//! stays removed.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::classify::{Disposition, RemoveContext, RetryAction, classify_remove_error};
use super::walker::children;
use crate::errors::{DirTreeError, Result};
use crate::native::{FileSystem, NativeCode, NativeError};
use crate::types::{FileAttributes, TransactionContext};

/// Bound on `remove_directory` attempts for one directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeleteOptions {
    pub recursive: bool,
    /// Clear the read-only attribute where it blocks removal.
    pub ignore_read_only: bool,
    /// Non-recursive delete refuses a populated directory instead of retrying.
    pub require_empty_if_not_recursive: bool,
    /// A root that is already gone is success.
    pub continue_if_missing: bool,
    pub transaction: Option<TransactionContext>,
    pub retry: RetryPolicy,
}

impl DeleteOptions {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            require_empty_if_not_recursive: !recursive,
            ..Default::default()
        }
    }

    pub fn with_ignore_read_only(mut self, yes: bool) -> Self {
        self.ignore_read_only = yes;
        self
    }

    pub fn with_require_empty(mut self, yes: bool) -> Self {
        self.require_empty_if_not_recursive = yes;
        self
    }

    pub fn with_continue_if_missing(mut self, yes: bool) -> Self {
        self.continue_if_missing = yes;
        self
    }

    pub fn with_transaction(mut self, tx: Option<TransactionContext>) -> Self {
        self.transaction = tx;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Per-directory removal bookkeeping.
#[derive(Debug)]
struct RetryState<'p> {
    path: &'p Path,
    attempts: u32,
    last_error: Option<NativeError>,
}

impl<'p> RetryState<'p> {
    fn new(path: &'p Path) -> Self {
        Self {
            path,
            attempts: 0,
            last_error: None,
        }
    }

    fn exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempts >= policy.attempts
    }

    fn into_error(self) -> DirTreeError {
        DirTreeError::RetryExhausted {
            path: self.path.to_path_buf(),
            attempts: self.attempts,
            code: self
                .last_error
                .map(|e| e.code)
                .unwrap_or(NativeCode::DirNotEmpty),
        }
    }
}

/// Delete the directory at `root` according to `opts`.
pub fn delete_directory<F: FileSystem>(
    fs: &F,
    root: impl AsRef<Path>,
    opts: &DeleteOptions,
) -> Result<()> {
    let root = fs.resolve(root.as_ref());
    info!(path = %root.display(), recursive = opts.recursive, "deleting directory");
    delete_resolved(fs, &root, opts)
}

/// Recursive delete with the usual defaults.
pub fn delete_tree<F: FileSystem>(fs: &F, root: impl AsRef<Path>) -> Result<()> {
    delete_directory(fs, root, &DeleteOptions::new(true))
}

pub(crate) fn delete_resolved<F: FileSystem>(
    fs: &F,
    root: &Path,
    opts: &DeleteOptions,
) -> Result<()> {
    delete_node(fs, root, opts, opts.continue_if_missing)
}

fn delete_node<F: FileSystem>(
    fs: &F,
    path: &Path,
    opts: &DeleteOptions,
    continue_if_missing: bool,
) -> Result<()> {
    let tx = opts.transaction.as_ref();

    // Resolve
    let info = match fs.query_metadata(path, tx) {
        Ok(info) => info,
        Err(e) if e.code.is_not_found() && continue_if_missing => {
            debug!(path = %path.display(), "already gone");
            return Ok(());
        }
        Err(e) => return Err(DirTreeError::from_native(path, "query", e)),
    };
    if !info.is_directory {
        return Err(DirTreeError::NotADirectory(path.to_path_buf()));
    }

    // MountCheck
    if info.is_mount_point {
        unmount(fs, path, tx)?;
    }

    let mut read_only = info.is_read_only();
    if read_only {
        if !opts.ignore_read_only {
            return Err(DirTreeError::ReadOnly(path.to_path_buf()));
        }
        clear_read_only(fs, path, info.attributes, tx)?;
        read_only = false;
    }

    let descend = opts.recursive && (!info.is_reparse_point || info.is_mount_point);
    let ctx = |read_only| RemoveContext {
        require_empty: !opts.recursive && opts.require_empty_if_not_recursive,
        continue_if_missing,
        ignore_read_only: opts.ignore_read_only,
        read_only,
    };

    let mut state = RetryState::new(path);
    loop {
        // RecurseChildren
        if descend {
            empty_directory(fs, path, opts)?;
        }

        // Remove
        state.attempts += 1;
        let err = match fs.remove_directory(path, tx) {
            Ok(()) => {
                debug!(path = %path.display(), attempts = state.attempts, "removed directory");
                return Ok(());
            }
            Err(e) => e,
        };

        match classify_remove_error(err.code, &ctx(read_only)) {
            Disposition::TreatAsSuccess => return Ok(()),
            Disposition::Fatal(kind) => return Err(kind.into_error(path, err)),
            Disposition::RetryBounded(action) => {
                let code = err.code;
                state.last_error = Some(err);
                if state.exhausted(&opts.retry) {
                    return Err(state.into_error());
                }
                warn!(path = %path.display(), attempt = state.attempts, %code, "directory removal failed; retrying");
                match action {
                    RetryAction::Immediately => {
                        if !opts.retry.delay.is_zero() {
                            thread::sleep(opts.retry.delay);
                        }
                    }
                    RetryAction::ClearReadOnly => {
                        clear_read_only(fs, path, info.attributes, tx)?;
                        read_only = false;
                    }
                }
            }
        }
    }
}

/// Remove every child of `dir`. A directory that vanished meanwhile is left to
/// the caller's own removal attempt to classify.
fn empty_directory<F: FileSystem>(fs: &F, dir: &Path, opts: &DeleteOptions) -> Result<()> {
    let tx = opts.transaction.as_ref();
    for entry in children(fs, dir, tx)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(DirTreeError::ListingFailed { code, .. }) if code.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        if entry.is_directory {
            delete_node(fs, &entry.full_path, opts, true)?;
        } else {
            remove_file_entry(fs, &entry.full_path, entry.attributes, opts.ignore_read_only, tx)?;
        }
    }
    Ok(())
}

fn unmount<F: FileSystem>(fs: &F, path: &Path, tx: Option<&TransactionContext>) -> Result<()> {
    match fs.unmount_mount_point(path, tx) {
        Ok(()) => {
            info!(path = %path.display(), "unmounted volume before removal");
            Ok(())
        }
        Err(e) if e.code == NativeCode::MountPointNotFound => {
            debug!(path = %path.display(), "nothing mounted");
            Ok(())
        }
        Err(e) => Err(DirTreeError::Native {
            path: path.to_path_buf(),
            op: "unmount",
            error: e,
        }),
    }
}

fn clear_read_only<F: FileSystem>(
    fs: &F,
    path: &Path,
    attributes: FileAttributes,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    debug!(path = %path.display(), "clearing read-only attribute");
    fs.set_attributes(path, attributes.without(FileAttributes::READ_ONLY), tx)
        .map_err(|e| DirTreeError::from_native(path, "set attributes", e))
}

/// Delete one file. Missing is success; read-only needs `ignore_read_only`.
pub fn delete_file<F: FileSystem>(
    fs: &F,
    path: impl AsRef<Path>,
    ignore_read_only: bool,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    let path: PathBuf = fs.resolve(path.as_ref());
    let info = match fs.query_metadata(&path, tx) {
        Ok(info) => info,
        Err(e) if e.code.is_not_found() => return Ok(()),
        Err(e) => return Err(DirTreeError::from_native(&path, "query", e)),
    };
    remove_file_entry(fs, &path, info.attributes, ignore_read_only, tx)
}

fn remove_file_entry<F: FileSystem>(
    fs: &F,
    path: &Path,
    attributes: FileAttributes,
    ignore_read_only: bool,
    tx: Option<&TransactionContext>,
) -> Result<()> {
    if attributes.is_read_only() && !ignore_read_only {
        return Err(DirTreeError::ReadOnly(path.to_path_buf()));
    }
    let retry_cleared = match fs.delete_file(path, tx) {
        Ok(()) => false,
        Err(e) if e.code.is_not_found() => {
            debug!(path = %path.display(), "file already gone");
            return Ok(());
        }
        Err(e) if e.code == NativeCode::AccessDenied && attributes.is_read_only() => true,
        Err(e) => return Err(DirTreeError::from_native(path, "delete file", e)),
    };
    if retry_cleared {
        clear_read_only(fs, path, attributes, tx)?;
        match fs.delete_file(path, tx) {
            Ok(()) => {}
            Err(e) if e.code.is_not_found() => {}
            Err(e) => return Err(DirTreeError::from_native(path, "delete file", e)),
        }
    }
    debug!(path = %path.display(), "deleted file");
    Ok(())
}
