//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the Ctrl-C handler and
//! dispatches the subcommand to the library.

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use dirtree::cli::{Args, Command, CopyArgs, DeleteArgs, ListArgs, MoveArgs, PruneArgs};
use dirtree::config::{CONFIG_ENV, env_config_path};
use dirtree::output as out;
use dirtree::{
    Config, CopyMoveOutcome, CopyOptions, CopyProgress, DeleteOptions, DirTreeError, LoadResult,
    MoveOptions, OsFileSystem, ProgressAction, PruneOptions, TransferOptions, TraversalRequest,
    copy_or_move, default_config_path, delete_directory, delete_file, io_error_with_help,
    load_config, prune_empty, shutdown, walk,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }
    let Some(command) = args.command.clone() else {
        bail!("no command given; run with --help for usage");
    };

    let loaded = load_config()?;
    let mut cfg = loaded.config();
    args.apply_overrides(&mut cfg);
    cfg.validate()?;

    let guard_opt = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    match &loaded {
        LoadResult::CreatedTemplate(path) => out::print_success(&format!(
            "A template dirtree config was written to: {}",
            path.display()
        )),
        LoadResult::Loaded(_, path) => debug!(path = %path.display(), "loaded config"),
        LoadResult::Defaults => debug!("no config file; using defaults"),
    }

    // Guard is dropped on Ctrl-C so buffered file logs are flushed
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current entry...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("failed to install signal handler")?;
    }

    debug!(?command, "starting dirtree");
    let fs = OsFileSystem::new();
    let result = match &command {
        Command::List(a) => run_list(fs, &cfg, a),
        Command::Delete(a) => run_delete(fs, &cfg, a),
        Command::Copy(a) => run_copy(fs, &cfg, a),
        Command::Move(a) => run_move(fs, &cfg, a),
        Command::Prune(a) => run_prune(fs, &cfg, a),
    };
    if let Err(e) = &result {
        log_failure(e);
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    result
}

fn print_config_location() {
    if let Some(p) = env_config_path() {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {}", p.display()));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Ok(p) => {
            out::print_info(&format!("Default dirtree config path:\n  {}", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet; one is written on the next run.");
            }
        }
        Err(e) => out::print_error(&format!("Could not determine a default config path: {e}")),
    }
}

fn log_failure(e: &anyhow::Error) {
    match e.downcast_ref::<DirTreeError>() {
        Some(dt) => error!(code = dt.code(), kind = dt.kind(), error = %dt, "operation failed"),
        None => error!(error = %format!("{e:#}"), "operation failed"),
    }
}

fn run_list(fs: OsFileSystem, cfg: &Config, a: &ListArgs) -> Result<()> {
    let request = TraversalRequest::new(&a.root)
        .recursive(a.recursive)
        .pattern(a.pattern.as_str())
        .files(!a.dirs_only)
        .folders(!a.files_only)
        .skip_reparse_points(cfg.skip_reparse_points)
        .continue_on_error(cfg.continue_on_error);

    let mut count = 0u64;
    for entry in walk(fs, request)? {
        let entry = entry?;
        out::print_user(&entry.full_path.display().to_string());
        count += 1;
    }
    info!(root = %a.root.display(), count, "listing finished");
    Ok(())
}

fn run_delete(fs: OsFileSystem, cfg: &Config, a: &DeleteArgs) -> Result<()> {
    let opts = DeleteOptions::new(a.recursive)
        .with_ignore_read_only(cfg.ignore_read_only)
        .with_continue_if_missing(a.missing_ok)
        .with_retry(cfg.retry_policy());

    let failures: Vec<anyhow::Error> = a
        .paths
        .par_iter()
        .filter_map(|p| delete_target(fs, p, &opts).err())
        .collect();
    first_failure(failures, "delete")?;
    out::print_success(&format!("deleted {} target(s)", a.paths.len()));
    Ok(())
}

fn delete_target(fs: OsFileSystem, path: &Path, opts: &DeleteOptions) -> Result<()> {
    let is_file = match std::fs::symlink_metadata(path) {
        // A link to anything but a directory is removed like a file.
        Ok(meta) => meta.is_file() || (meta.file_type().is_symlink() && !path.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(io_error_with_help("inspect", path)(e)),
    };
    if is_file {
        delete_file(&fs, path, opts.ignore_read_only, None)?;
    } else {
        delete_directory(&fs, path, opts)?;
    }
    debug!(path = %path.display(), "deleted");
    Ok(())
}

fn run_prune(fs: OsFileSystem, cfg: &Config, a: &PruneArgs) -> Result<()> {
    let opts = PruneOptions::new(a.recursive)
        .with_ignore_read_only(cfg.ignore_read_only)
        .with_retry(cfg.retry_policy());

    let results: Vec<(PathBuf, Result<usize>)> = a
        .roots
        .par_iter()
        .map(|root| {
            let res = prune_empty(&fs, root, &opts)
                .map(|report| report.removed.len())
                .map_err(anyhow::Error::from);
            (root.clone(), res)
        })
        .collect();

    let mut failures = Vec::new();
    for (root, res) in results {
        match res {
            Ok(n) => out::print_success(&format!(
                "pruned {n} empty director{} under {}",
                if n == 1 { "y" } else { "ies" },
                root.display()
            )),
            Err(e) => failures.push(e),
        }
    }
    first_failure(failures, "prune")
}

/// Report every failure and return the first one.
fn first_failure(failures: Vec<anyhow::Error>, op: &str) -> Result<()> {
    let total = failures.len();
    let mut iter = failures.into_iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    for other in iter {
        log_failure(&other);
        out::print_error(&format!("{other:#}"));
    }
    if total > 1 {
        warn!(failed = total, "{op} failed for several targets");
    }
    Err(first)
}

/// Progress callback that honors Ctrl-C between entries.
fn cancel_on_shutdown(p: &CopyProgress<'_>) -> ProgressAction {
    debug!(kind = ?p.kind, source = %p.source.display(), entries = p.entries_processed, "progress");
    if shutdown::is_requested() {
        ProgressAction::Cancel
    } else {
        ProgressAction::Continue
    }
}

fn run_copy(fs: OsFileSystem, cfg: &Config, a: &CopyArgs) -> Result<()> {
    let opts = TransferOptions::copy(CopyOptions {
        overwrite_existing: a.overwrite,
        preserve_timestamps: a.preserve_timestamps,
    })
    .with_retry(cfg.retry_policy());
    let outcome = copy_or_move(&fs, &a.source, &a.destination, &opts, cancel_on_shutdown)?;
    finish_transfer(&outcome, "copied")
}

fn run_move(fs: OsFileSystem, cfg: &Config, a: &MoveArgs) -> Result<()> {
    let opts = TransferOptions::move_with(MoveOptions {
        replace_existing: a.replace,
        copy_allowed: a.allow_copy,
    })
    .with_retry(cfg.retry_policy());
    let outcome = copy_or_move(&fs, &a.source, &a.destination, &opts, cancel_on_shutdown)?;
    finish_transfer(&outcome, "moved")
}

fn finish_transfer(outcome: &CopyMoveOutcome, verb: &str) -> Result<()> {
    if outcome.was_canceled {
        out::print_warn(&format!(
            "canceled after {} entries; '{}' is incomplete",
            outcome.entries_processed,
            outcome.destination_path.display()
        ));
        return Err(anyhow!(
            "{verb} of '{}' was canceled",
            outcome.source_path.display()
        ));
    }
    out::print_success(&format!(
        "{verb} '{}' -> '{}' ({} entries, {} bytes)",
        outcome.source_path.display(),
        outcome.destination_path.display(),
        outcome.entries_processed,
        outcome.bytes_transferred
    ));
    Ok(())
}
