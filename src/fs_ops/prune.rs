//! Removal of directories that are empty once their own children are pruned.
//!
//! Post-order: a child directory is pruned first, then re-listed, then removed
//! if nothing is left. Links, junctions and mount points are left alone. The
//! root is never removed.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::delete::{DeleteOptions, RetryPolicy, delete_resolved};
use super::walker::{children, is_empty_dir};
use crate::errors::{DirTreeError, Result};
use crate::native::FileSystem;
use crate::types::{DirectoryEntryInfo, TransactionContext};

#[derive(Clone, Debug)]
pub struct PruneOptions {
    /// Prune below the immediate children too.
    pub recursive: bool,
    pub ignore_read_only: bool,
    pub transaction: Option<TransactionContext>,
    pub retry: RetryPolicy,
}

impl Default for PruneOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            ignore_read_only: false,
            transaction: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl PruneOptions {
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            ..Default::default()
        }
    }

    pub fn with_ignore_read_only(mut self, yes: bool) -> Self {
        self.ignore_read_only = yes;
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

    fn delete_options(&self) -> DeleteOptions {
        DeleteOptions::new(false)
            .with_require_empty(true)
            .with_continue_if_missing(true)
            .with_ignore_read_only(self.ignore_read_only)
            .with_transaction(self.transaction)
            .with_retry(self.retry)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Removed directories, deepest first within each branch.
    pub removed: Vec<PathBuf>,
}

/// Remove empty subdirectories of `root`.
pub fn prune_empty<F: FileSystem>(
    fs: &F,
    root: impl AsRef<Path>,
    opts: &PruneOptions,
) -> Result<PruneReport> {
    let root = fs.resolve(root.as_ref());
    let tx = opts.transaction.as_ref();
    let info = fs
        .query_metadata(&root, tx)
        .map_err(|e| DirTreeError::from_native(&root, "query", e))?;
    if !info.is_directory {
        return Err(DirTreeError::NotADirectory(root));
    }

    info!(path = %root.display(), recursive = opts.recursive, "pruning empty directories");
    let mut report = PruneReport::default();
    prune_children(fs, &root, opts, &mut report)?;
    info!(path = %root.display(), removed = report.removed.len(), "prune finished");
    Ok(report)
}

fn prune_children<F: FileSystem>(
    fs: &F,
    dir: &Path,
    opts: &PruneOptions,
    report: &mut PruneReport,
) -> Result<()> {
    let tx = opts.transaction.as_ref();
    let subdirs: Vec<DirectoryEntryInfo> = children(fs, dir, tx)?
        .filter(|e| {
            e.as_ref().map_or(true, |e| {
                e.is_directory && !e.is_reparse_point && !e.is_mount_point
            })
        })
        .collect::<Result<_>>()?;

    for sub in subdirs {
        if opts.recursive {
            prune_children(fs, &sub.full_path, opts, report)?;
        }
        if !is_empty_dir(fs, &sub.full_path, tx)? {
            continue;
        }
        match delete_resolved(fs, &sub.full_path, &opts.delete_options()) {
            Ok(()) => {
                debug!(path = %sub.full_path.display(), "pruned empty directory");
                report.removed.push(sub.full_path);
            }
            // Something was created in it after the check; leave it.
            Err(DirTreeError::DirectoryNotEmpty(_)) => {
                debug!(path = %sub.full_path.display(), "directory filled up before removal");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
