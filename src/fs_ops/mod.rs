//! Tree operations built on the native per-entry primitives.

mod classify;
mod create;
mod delete;
mod helpers;
mod prune;
mod transfer;
mod walker;

pub use classify::{Disposition, FatalKind, RemoveContext, RetryAction, classify_remove_error};
pub use create::create_directory;
pub use delete::{DeleteOptions, RetryPolicy, delete_directory, delete_file, delete_tree};
pub use helpers::io_error_with_help;
pub use prune::{PruneOptions, PruneReport, prune_empty};
pub use transfer::{
    CopyOptions, MoveOptions, TransferOptions, copy_directory, copy_or_move, ignore_progress,
    move_directory,
};
pub use walker::{
    ErrorFilter, TraversalRequest, Walker, count_entries, directories, entries, files,
    is_empty_dir, walk,
};
