//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! --debug is a shorthand for --log-level debug.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{Config, LogLevel};

/// Walk, delete, copy, move and prune directory trees.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Recursive directory tree operations")]
pub struct Args {
    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        global = true,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<LogLevel>,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Also write logs to this file.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Print where dirtree will look for the config file (or DIRTREE_CONFIG if set), then exit.
    #[arg(long, help = "Print the config file location used by dirtree and exit")]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List entries below a directory, one path per line.
    List(ListArgs),
    /// Delete directories (or files).
    Delete(DeleteArgs),
    /// Copy a directory tree.
    Copy(CopyArgs),
    /// Move a directory tree, copying across volumes when allowed.
    Move(MoveArgs),
    /// Remove empty subdirectories.
    Prune(PruneArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ListArgs {
    #[arg(value_hint = ValueHint::DirPath)]
    pub root: PathBuf,

    /// Glob matched against entry names (`*`, `?`).
    #[arg(long, default_value = "*")]
    pub pattern: String,

    #[arg(short, long)]
    pub recursive: bool,

    #[arg(long, conflicts_with = "dirs_only")]
    pub files_only: bool,

    #[arg(long)]
    pub dirs_only: bool,

    /// Descend into symlinks and junctions (overrides config).
    #[arg(long)]
    pub follow_reparse: bool,

    /// Keep going past directories that cannot be listed.
    #[arg(long)]
    pub continue_on_error: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    #[arg(short, long)]
    pub recursive: bool,

    #[arg(long)]
    pub ignore_read_only: bool,

    /// Treat a missing target as already deleted.
    #[arg(long)]
    pub missing_ok: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct CopyArgs {
    #[arg(value_hint = ValueHint::DirPath)]
    pub source: PathBuf,
    #[arg(value_hint = ValueHint::DirPath)]
    pub destination: PathBuf,

    /// Replace files that already exist at the destination.
    #[arg(long)]
    pub overwrite: bool,

    #[arg(long)]
    pub preserve_timestamps: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MoveArgs {
    #[arg(value_hint = ValueHint::DirPath)]
    pub source: PathBuf,
    #[arg(value_hint = ValueHint::DirPath)]
    pub destination: PathBuf,

    /// Replace an existing destination.
    #[arg(long)]
    pub replace: bool,

    /// Fall back to copy + delete when the destination is on another volume.
    #[arg(long)]
    pub allow_copy: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PruneArgs {
    #[arg(required = true, value_hint = ValueHint::DirPath)]
    pub roots: Vec<PathBuf>,

    #[arg(short, long)]
    pub recursive: bool,

    #[arg(long)]
    pub ignore_read_only: bool,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(p) = &self.log_file {
            cfg.log_file = Some(p.clone());
        }
        match &self.command {
            Some(Command::List(a)) => {
                if a.follow_reparse {
                    cfg.skip_reparse_points = false;
                }
                if a.continue_on_error {
                    cfg.continue_on_error = true;
                }
            }
            Some(Command::Delete(a)) if a.ignore_read_only => cfg.ignore_read_only = true,
            Some(Command::Prune(a)) if a.ignore_read_only => cfg.ignore_read_only = true,
            _ => {}
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
