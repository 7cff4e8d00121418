//! Recursive copy and move of directory trees.
//!
//! Copy mirrors the source one directory at a time: the destination directory
//! is created before anything below it, files go through the native copy,
//! links are recreated as links and never entered.
//!
//! Move on one volume is a single native rename. Across volumes it is copy then
//! delete, and only when the caller allows copying. A canceled copy-based move
//! leaves the source in place; nothing already copied is rolled back.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::create::{create_one, create_resolved};
use super::delete::{DeleteOptions, RetryPolicy, delete_file, delete_resolved};
use super::helpers::{is_within, nearest_existing_ancestor, same_path};
use super::walker::children;
use crate::errors::{DirTreeError, Result};
use crate::native::{CopyFileFlags, FileSystem, NativeCode, NativeError};
use crate::types::{
    CopyMoveOutcome, CopyProgress, DirectoryEntryInfo, ProgressAction, ProgressKind,
    TransactionContext,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Replace files that already exist at the destination.
    pub overwrite_existing: bool,
    pub preserve_timestamps: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveOptions {
    /// Delete an existing destination before moving into its place.
    pub replace_existing: bool,
    /// Fall back to copy and delete when the rename cannot cross volumes.
    pub copy_allowed: bool,
}

/// Exactly one of `copy` and `mv` must be set.
#[derive(Clone, Debug, Default)]
pub struct TransferOptions {
    pub copy: Option<CopyOptions>,
    pub mv: Option<MoveOptions>,
    pub transaction: Option<TransactionContext>,
    /// Used by the deletes a move performs.
    pub retry: RetryPolicy,
}

impl TransferOptions {
    pub fn copy(opts: CopyOptions) -> Self {
        Self {
            copy: Some(opts),
            ..Default::default()
        }
    }

    pub fn move_with(opts: MoveOptions) -> Self {
        Self {
            mv: Some(opts),
            ..Default::default()
        }
    }

    pub fn with_transaction(mut self, tx: Option<TransactionContext>) -> Self {
        self.transaction = tx;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn mode(&self) -> Result<Mode> {
        match (self.copy, self.mv) {
            (Some(c), None) => Ok(Mode::Copy(c)),
            (None, Some(m)) => Ok(Mode::Move(m)),
            (Some(_), Some(_)) => Err(DirTreeError::Configuration(
                "copy and move options are mutually exclusive".into(),
            )),
            (None, None) => Err(DirTreeError::Configuration(
                "either copy or move options are required".into(),
            )),
        }
    }

    fn delete_options(&self) -> DeleteOptions {
        DeleteOptions::new(true)
            .with_ignore_read_only(true)
            .with_transaction(self.transaction)
            .with_retry(self.retry)
    }
}

enum Mode {
    Copy(CopyOptions),
    Move(MoveOptions),
}

/// Progress callback that never cancels.
pub fn ignore_progress(_: &CopyProgress<'_>) -> ProgressAction {
    ProgressAction::Continue
}

struct Transfer<'f, F, P> {
    fs: &'f F,
    tx: Option<&'f TransactionContext>,
    progress: P,
    flags: CopyFileFlags,
    entries: u64,
    bytes: u64,
    canceled: bool,
}

impl<'f, F, P> Transfer<'f, F, P>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    fn record(
        &mut self,
        kind: ProgressKind,
        source: &Path,
        destination: &Path,
        entry_bytes: u64,
    ) -> ProgressAction {
        self.entries += 1;
        self.bytes += entry_bytes;
        let record = CopyProgress {
            kind,
            source,
            destination,
            entry_bytes,
            entries_processed: self.entries,
            bytes_transferred: self.bytes,
        };
        (self.progress)(&record)
    }

    /// Report a completed entry; a cancel stops before the next one.
    fn report(&mut self, kind: ProgressKind, source: &Path, destination: &Path, entry_bytes: u64) {
        if self.record(kind, source, destination, entry_bytes) == ProgressAction::Cancel {
            info!(entries = self.entries, "transfer canceled by progress callback");
            self.canceled = true;
        }
    }

    fn copy_tree(&mut self, src: &Path, dst: &Path, is_root: bool) -> Result<()> {
        let tx = self.tx;
        if is_root {
            create_resolved(self.fs, dst, tx)?;
        } else {
            create_one(self.fs, dst, tx)?;
        }
        self.report(ProgressKind::DirectoryCreated, src, dst, 0);
        if self.canceled {
            return Ok(());
        }

        for entry in children(self.fs, src, tx)? {
            let entry = entry?;
            let target = dst.join(&entry.name);
            if entry.is_reparse_point {
                self.copy_leaf(&entry, &target, true)?;
            } else if entry.is_directory {
                self.copy_tree(&entry.full_path, &target, false)?;
            } else {
                self.copy_leaf(&entry, &target, false)?;
            }
            if self.canceled {
                return Ok(());
            }
        }
        Ok(())
    }

    fn copy_leaf(&mut self, entry: &DirectoryEntryInfo, target: &Path, as_link: bool) -> Result<()> {
        let flags = CopyFileFlags {
            copy_symlink: as_link,
            ..self.flags
        };
        let n = self
            .fs
            .copy_file(&entry.full_path, target, &flags, self.tx)
            .map_err(|e| copy_error(&entry.full_path, target, e))?;
        debug!(src = %entry.full_path.display(), dest = %target.display(), bytes = n, "copied");
        let kind = if as_link {
            ProgressKind::LinkCopied
        } else {
            ProgressKind::FileCopied
        };
        self.report(kind, &entry.full_path, target, n);
        Ok(())
    }

    fn outcome(&self, src: PathBuf, dst: PathBuf, is_move: bool) -> CopyMoveOutcome {
        CopyMoveOutcome {
            source_path: src,
            destination_path: dst,
            succeeded: !self.canceled,
            is_move,
            was_canceled: self.canceled,
            native_error_code: if self.canceled {
                NativeCode::RequestAborted.raw()
            } else {
                0
            },
            entries_processed: self.entries,
            bytes_transferred: self.bytes,
        }
    }
}

fn copy_error(src: &Path, dst: &Path, e: NativeError) -> DirTreeError {
    if e.code.is_already_exists() {
        DirTreeError::AlreadyExists(dst.to_path_buf())
    } else {
        DirTreeError::from_native(src, "copy file", e)
    }
}

/// Copy or move the directory tree at `source` to `destination`.
///
/// `progress` runs after every completed entry; returning
/// [`ProgressAction::Cancel`] stops before the next one.
pub fn copy_or_move<F, P>(
    fs: &F,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    opts: &TransferOptions,
    progress: P,
) -> Result<CopyMoveOutcome>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    let mode = opts.mode()?;
    let src = fs.resolve(source.as_ref());
    let dst = fs.resolve(destination.as_ref());
    if same_path(&src, &dst) {
        return Err(DirTreeError::SameSourceAndDestination(src));
    }
    if is_within(&dst, &src) {
        return Err(DirTreeError::DestinationInsideSource {
            src_path: src,
            dst_path: dst,
        });
    }
    if is_within(&src, &dst) {
        return Err(DirTreeError::SourceInsideDestination {
            src_path: src,
            dst_path: dst,
        });
    }

    let tx = opts.transaction.as_ref();
    let info = fs
        .query_metadata(&src, tx)
        .map_err(|e| DirTreeError::from_native(&src, "query", e))?;
    if !info.is_directory {
        return Err(DirTreeError::NotADirectory(src));
    }

    let mut run = Transfer {
        fs,
        tx,
        progress,
        flags: CopyFileFlags::default(),
        entries: 0,
        bytes: 0,
        canceled: false,
    };

    match mode {
        Mode::Copy(c) => {
            info!(src = %src.display(), dest = %dst.display(), "copying directory tree");
            run.flags = CopyFileFlags {
                overwrite: c.overwrite_existing,
                copy_symlink: false,
                preserve_timestamps: c.preserve_timestamps,
            };
            run.copy_tree(&src, &dst, true)?;
            Ok(run.outcome(src, dst, false))
        }
        Mode::Move(m) => {
            info!(src = %src.display(), dest = %dst.display(), "moving directory tree");
            move_tree(&mut run, &src, &dst, m, opts)?;
            Ok(run.outcome(src, dst, true))
        }
    }
}

fn move_tree<F, P>(
    run: &mut Transfer<'_, F, P>,
    src: &Path,
    dst: &Path,
    m: MoveOptions,
    opts: &TransferOptions,
) -> Result<()>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    let fs = run.fs;
    let tx = run.tx;
    let anchor =
        nearest_existing_ancestor(fs, dst, tx).ok_or_else(|| DirTreeError::NotFound(dst.to_path_buf()))?;
    let same_volume = fs
        .same_volume(src, &anchor, tx)
        .map_err(|e| DirTreeError::from_native(src, "volume query", e))?;

    let mut existing = match fs.query_metadata(dst, tx) {
        Ok(info) => Some(info),
        Err(e) if e.code.is_not_found() => None,
        Err(e) => return Err(DirTreeError::from_native(dst, "query", e)),
    };
    if existing.is_some() && !m.replace_existing {
        return Err(DirTreeError::AlreadyExists(dst.to_path_buf()));
    }

    if same_volume {
        if rename_tree(run, src, dst, &mut existing, m, opts)? {
            return Ok(());
        }
    } else if !m.copy_allowed {
        return Err(DirTreeError::NotSameDevice {
            src_path: src.to_path_buf(),
            dst_path: dst.to_path_buf(),
        });
    }

    // Copy and delete goes ahead; only now is an old destination removed.
    if let Some(existing) = &existing {
        replace_destination(fs, dst, existing.is_directory, opts)?;
    }
    run.flags = CopyFileFlags {
        overwrite: m.replace_existing,
        copy_symlink: false,
        preserve_timestamps: true,
    };
    run.copy_tree(src, dst, true)?;
    if run.canceled {
        warn!(src = %src.display(), "move canceled; source left in place");
        return Ok(());
    }
    delete_resolved(fs, src, &opts.delete_options())?;
    info!(src = %src.display(), dest = %dst.display(), "moved directory tree by copy and delete");
    Ok(())
}

/// Codes a rename reports when something already sits at the destination.
fn destination_occupied(code: NativeCode) -> bool {
    code.is_already_exists()
        || matches!(
            code,
            NativeCode::DirNotEmpty | NativeCode::NotADirectory | NativeCode::AccessDenied
        )
}

/// Rename `src` onto `dst`. An existing destination is removed only after the
/// rename has shown it is the one thing in the way; `existing` is cleared then.
///
/// `Ok(false)` means the rename crossed volumes and copying is allowed.
fn rename_tree<F, P>(
    run: &mut Transfer<'_, F, P>,
    src: &Path,
    dst: &Path,
    existing: &mut Option<DirectoryEntryInfo>,
    m: MoveOptions,
    opts: &TransferOptions,
) -> Result<bool>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    let fs = run.fs;
    let tx = run.tx;
    loop {
        match fs.move_entry(src, dst, m.replace_existing, tx) {
            Ok(()) => {
                // The tree is already in place; a cancel here has nothing left to stop.
                let _ = run.record(ProgressKind::TreeMoved, src, dst, 0);
                info!(src = %src.display(), dest = %dst.display(), "renamed directory tree");
                return Ok(true);
            }
            Err(e) if e.code == NativeCode::NotSameDevice && m.copy_allowed => {
                warn!(src = %src.display(), dest = %dst.display(), "rename crossed volumes; falling back to copy and delete");
                return Ok(false);
            }
            Err(e) if e.code == NativeCode::NotSameDevice => {
                return Err(DirTreeError::NotSameDevice {
                    src_path: src.to_path_buf(),
                    dst_path: dst.to_path_buf(),
                });
            }
            Err(e) if existing.is_some() && destination_occupied(e.code) => {
                if let Some(old) = existing.take() {
                    replace_destination(fs, dst, old.is_directory, opts)?;
                }
            }
            Err(e) if e.code.is_already_exists() || e.code == NativeCode::DirNotEmpty => {
                return Err(DirTreeError::AlreadyExists(dst.to_path_buf()));
            }
            Err(e) => return Err(DirTreeError::from_native(src, "move", e)),
        }
    }
}

fn replace_destination<F: FileSystem>(
    fs: &F,
    dst: &Path,
    is_directory: bool,
    opts: &TransferOptions,
) -> Result<()> {
    debug!(dest = %dst.display(), "removing existing destination");
    if is_directory {
        delete_resolved(fs, dst, &opts.delete_options())
    } else {
        delete_file(fs, dst, true, opts.transaction.as_ref())
    }
}

/// Copy the tree at `source` to `destination`.
pub fn copy_directory<F, P>(
    fs: &F,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    opts: CopyOptions,
    progress: P,
) -> Result<CopyMoveOutcome>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    copy_or_move(fs, source, destination, &TransferOptions::copy(opts), progress)
}

/// Move the tree at `source` to `destination`.
pub fn move_directory<F, P>(
    fs: &F,
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    opts: MoveOptions,
    progress: P,
) -> Result<CopyMoveOutcome>
where
    F: FileSystem,
    P: FnMut(&CopyProgress<'_>) -> ProgressAction,
{
    copy_or_move(fs, source, destination, &TransferOptions::move_with(opts), progress)
}
