//! Path comparison helpers and I/O error enrichment.
//!
//! Resolved paths are compared component-wise and case-insensitively, so
//! `/Data/Tree` and `/data/tree/` are the same location for topology checks.
//!
//! Usage of the error adapter, in functions returning anyhow::Result<_>:
//!   fs::create_dir_all(dir).map_err(io_error_with_help("create dir", dir))?;

use anyhow::anyhow;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::native::{FileSystem, hint, native_error_from_io};
use crate::types::TransactionContext;

fn component_keys(path: &Path) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect()
}

/// Case-insensitive equality of two resolved paths.
pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    component_keys(a) == component_keys(b)
}

/// True when `inner` lies strictly below `outer`.
pub(crate) fn is_within(inner: &Path, outer: &Path) -> bool {
    let inner = component_keys(inner);
    let outer = component_keys(outer);
    inner.len() > outer.len() && inner.starts_with(&outer)
}

/// `path` itself or its closest ancestor that the native layer can see.
pub(crate) fn nearest_existing_ancestor<F: FileSystem>(
    fs: &F,
    path: &Path,
    tx: Option<&TransactionContext>,
) -> Option<PathBuf> {
    path.ancestors()
        .filter(|p| !p.as_os_str().is_empty())
        .find(|p| fs.query_metadata(p, tx).is_ok())
        .map(Path::to_path_buf)
}

fn build_message(op: &str, path: &Path, e: &io::Error) -> String {
    let mut msg = format!("{} '{}': {}", op, path.display(), e);
    let native = native_error_from_io(e);
    if let Some(h) = hint(native.code) {
        msg.push_str("; ");
        msg.push_str(h);
    }
    if let Some(code) = e.raw_os_error() {
        msg.push_str(&format!(" [os code: {code}]"));
    }
    msg
}

/// Adapter for anyhow::Result code.
/// Returns a closure suitable for `.map_err(...)` that converts io::Error -> anyhow::Error.
pub fn io_error_with_help<'a>(
    op: &'a str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!(build_message(op, path, &e))
}
