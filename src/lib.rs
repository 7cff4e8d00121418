//! Core library for `dirtree`.
//!
//! Recursive directory-tree operations built on a small per-entry native
//! interface ([`FileSystem`]): a lazy walker, a retrying recursive delete,
//! copy/move with progress and cancellation, and an empty-subtree pruner.
//! [`OsFileSystem`] backs the interface with `std::fs`; tests use the
//! in-memory `testing::MemFileSystem`.
//!
//! ```no_run
//! use dirtree::{DeleteOptions, OsFileSystem, delete_directory};
//!
//! let fs = OsFileSystem::new();
//! delete_directory(&fs, "/tmp/build-cache", &DeleteOptions::new(true))?;
//! # Ok::<(), dirtree::DirTreeError>(())
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod fs_ops;
pub mod native;
pub mod output;
pub mod platform;
pub mod shutdown;
pub mod types;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::{
    Config, LoadResult, LogLevel, default_config_path, default_log_path, load_config,
    path_has_symlink_ancestor,
};
pub use errors::{DirTreeError, Result};
pub use fs_ops::{
    CopyOptions, DeleteOptions, MoveOptions, PruneOptions, PruneReport, RetryPolicy,
    TransferOptions, TraversalRequest, Walker, classify_remove_error, copy_directory,
    copy_or_move, count_entries, create_directory, delete_directory, delete_file, delete_tree,
    directories, entries, files, ignore_progress, io_error_with_help, is_empty_dir,
    move_directory, prune_empty, walk,
};
pub use native::{FileSystem, NativeCode, NativeError, OsFileSystem};
pub use types::{
    CopyMoveOutcome, CopyProgress, DirectoryEntryInfo, FileAttributes, ProgressAction,
    ProgressKind, TransactionContext,
};
