//! Lazy depth-first traversal over the per-directory listing primitive.
//!
//! - Pre-order: a directory is yielded before anything below it.
//! - One native listing per directory, fetched only when the walk reaches it.
//!   An explicit stack of pending batches replaces recursion, so deep trees
//!   cost heap, not call stack.
//! - The search pattern filters what is yielded, never what is descended into.
//! - The root itself is never yielded.

use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use std::path::{Path, PathBuf};
use std::vec::IntoIter;
use tracing::{debug, warn};

use crate::errors::{DirTreeError, Result};
use crate::native::{FileSystem, NativeError};
use crate::types::{DirectoryEntryInfo, TransactionContext};

/// Callback consulted for a listing error when `continue_on_error` is off.
/// Returning `true` skips the failed subtree.
pub type ErrorFilter<'a> = Box<dyn Fn(&Path, &NativeError) -> bool + 'a>;

/// Input to [`walk`].
pub struct TraversalRequest<'a> {
    pub root_path: PathBuf,
    pub transaction: Option<TransactionContext>,
    /// `*` and `?` wildcards matched against entry names; `*` by default.
    pub search_pattern: String,
    pub recursive: bool,
    pub include_files: bool,
    pub include_folders: bool,
    /// Do not descend into links and junctions. On by default.
    pub skip_reparse_points: bool,
    pub continue_on_error: bool,
    pub error_filter: Option<ErrorFilter<'a>>,
}

impl fmt::Debug for TraversalRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalRequest")
            .field("root_path", &self.root_path)
            .field("transaction", &self.transaction)
            .field("search_pattern", &self.search_pattern)
            .field("recursive", &self.recursive)
            .field("include_files", &self.include_files)
            .field("include_folders", &self.include_folders)
            .field("skip_reparse_points", &self.skip_reparse_points)
            .field("continue_on_error", &self.continue_on_error)
            .field("error_filter", &self.error_filter.is_some())
            .finish()
    }
}

impl<'a> TraversalRequest<'a> {
    /// Non-recursive listing of files and folders under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
            transaction: None,
            search_pattern: "*".to_string(),
            recursive: false,
            include_files: false,
            include_folders: false,
            skip_reparse_points: true,
            continue_on_error: false,
            error_filter: None,
        }
    }

    pub fn recursive(mut self, yes: bool) -> Self {
        self.recursive = yes;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.search_pattern = pattern.into();
        self
    }

    pub fn files(mut self, yes: bool) -> Self {
        self.include_files = yes;
        self
    }

    pub fn folders(mut self, yes: bool) -> Self {
        self.include_folders = yes;
        self
    }

    pub fn skip_reparse_points(mut self, yes: bool) -> Self {
        self.skip_reparse_points = yes;
        self
    }

    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }

    pub fn transaction(mut self, tx: Option<TransactionContext>) -> Self {
        self.transaction = tx;
        self
    }

    pub fn error_filter(mut self, filter: impl Fn(&Path, &NativeError) -> bool + 'a) -> Self {
        self.error_filter = Some(Box::new(filter));
        self
    }
}

/// Translate the `*`/`?` pattern to a glob with every other metacharacter literal.
fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let pattern = if pattern.is_empty() { "*" } else { pattern };
    let mut glob = String::with_capacity(pattern.len() + 8);
    for ch in pattern.chars() {
        match ch {
            '[' | ']' | '{' | '}' => {
                glob.push('[');
                glob.push(ch);
                glob.push(']');
            }
            _ => glob.push(ch),
        }
    }
    GlobBuilder::new(&glob)
        .literal_separator(true)
        .case_insensitive(true)
        .backslash_escape(false)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| DirTreeError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        })
}

/// Iterator returned by [`walk`].
pub struct Walker<'a, F: FileSystem> {
    fs: F,
    request: TraversalRequest<'a>,
    matcher: GlobMatcher,
    /// Directory whose listing comes next; its entries splice in before siblings.
    pending: Option<PathBuf>,
    stack: Vec<IntoIter<DirectoryEntryInfo>>,
    done: bool,
}

impl<'a, F: FileSystem> Walker<'a, F> {
    /// Start at `request.root_path` exactly as given.
    pub(crate) fn new(fs: F, mut request: TraversalRequest<'a>) -> Result<Self> {
        let matcher = compile_pattern(&request.search_pattern)?;
        if !request.include_files && !request.include_folders {
            request.include_files = true;
            request.include_folders = true;
        }
        let pending = Some(request.root_path.clone());
        Ok(Self {
            fs,
            request,
            matcher,
            pending,
            stack: Vec::new(),
            done: false,
        })
    }

    fn tolerates(&self, dir: &Path, err: &NativeError) -> bool {
        self.request.continue_on_error
            || self
                .request
                .error_filter
                .as_ref()
                .is_some_and(|filter| filter(dir, err))
    }

    /// List `dir` onto the stack. `Some(err)` ends the walk.
    fn descend(&mut self, dir: PathBuf) -> Option<DirTreeError> {
        match self
            .fs
            .list_children(&dir, self.request.transaction.as_ref())
        {
            Ok(children) => {
                let batch: Vec<DirectoryEntryInfo> = children
                    .into_iter()
                    .filter(|c| c.name != "." && c.name != "..")
                    .map(|c| c.into_entry_info(&dir))
                    .collect();
                self.stack.push(batch.into_iter());
                None
            }
            Err(err) if self.tolerates(&dir, &err) => {
                warn!(path = %dir.display(), code = %err.code, "skipping subtree that could not be listed");
                None
            }
            Err(err) => {
                debug!(path = %dir.display(), code = %err.code, "listing failed; ending walk");
                Some(DirTreeError::ListingFailed {
                    path: dir,
                    code: err.code,
                })
            }
        }
    }

    fn matches(&self, entry: &DirectoryEntryInfo) -> bool {
        self.matcher.is_match(&entry.name)
    }
}

impl<F: FileSystem> Iterator for Walker<'_, F> {
    type Item = Result<DirectoryEntryInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(dir) = self.pending.take()
                && let Some(err) = self.descend(dir)
            {
                self.done = true;
                return Some(Err(err));
            }
            let Some(batch) = self.stack.last_mut() else {
                self.done = true;
                return None;
            };
            let Some(entry) = batch.next() else {
                self.stack.pop();
                continue;
            };

            if entry.is_directory {
                let follow = !entry.is_reparse_point || !self.request.skip_reparse_points;
                if self.request.recursive && follow {
                    self.pending = Some(entry.full_path.clone());
                }
                if self.request.include_folders && self.matches(&entry) {
                    return Some(Ok(entry));
                }
            } else if self.request.include_files && self.matches(&entry) {
                return Some(Ok(entry));
            }
        }
    }
}

/// Start a walk rooted at the resolved form of `request.root_path`.
pub fn walk<'a, F: FileSystem>(fs: F, mut request: TraversalRequest<'a>) -> Result<Walker<'a, F>> {
    request.root_path = fs.resolve(&request.root_path);
    debug!(
        root = %request.root_path.display(),
        pattern = %request.search_pattern,
        recursive = request.recursive,
        "starting walk"
    );
    Walker::new(fs, request)
}

/// Files and folders under `root`.
pub fn entries<F: FileSystem>(
    fs: F,
    root: impl Into<PathBuf>,
    recursive: bool,
) -> Result<Walker<'static, F>> {
    walk(fs, TraversalRequest::new(root).recursive(recursive))
}

/// Files only.
pub fn files<F: FileSystem>(
    fs: F,
    root: impl Into<PathBuf>,
    recursive: bool,
) -> Result<Walker<'static, F>> {
    walk(fs, TraversalRequest::new(root).recursive(recursive).files(true))
}

/// Folders only.
pub fn directories<F: FileSystem>(
    fs: F,
    root: impl Into<PathBuf>,
    recursive: bool,
) -> Result<Walker<'static, F>> {
    walk(fs, TraversalRequest::new(root).recursive(recursive).folders(true))
}

/// Number of entries a walk would yield. The first unskipped error is returned.
pub fn count_entries<F: FileSystem>(fs: F, request: TraversalRequest<'_>) -> Result<u64> {
    let mut n = 0u64;
    for entry in walk(fs, request)? {
        entry?;
        n += 1;
    }
    Ok(n)
}

/// Whether `path` has no children. Lists once and stops at the first child.
pub fn is_empty_dir<F: FileSystem>(
    fs: &F,
    path: &Path,
    tx: Option<&TransactionContext>,
) -> Result<bool> {
    let children = fs
        .list_children(path, tx)
        .map_err(|e| DirTreeError::from_native(path, "list directory", e))?;
    Ok(!children.iter().any(|c| c.name != "." && c.name != ".."))
}

/// One-level walk of `dir` used by the orchestrators: files and folders,
/// no pattern, no tolerance, root taken as already resolved.
pub(crate) fn children<F: FileSystem>(
    fs: F,
    dir: &Path,
    tx: Option<&TransactionContext>,
) -> Result<Walker<'static, F>> {
    Walker::new(
        fs,
        TraversalRequest::new(dir)
            .files(true)
            .folders(true)
            .transaction(tx.copied()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeCode;
    use crate::testing::{MemFileSystem, Op};

    fn tree() -> MemFileSystem {
        let fs = MemFileSystem::new();
        fs.add_file("/t/a.txt", 1);
        fs.add_file("/t/sub/b.TXT", 2);
        fs.add_file("/t/sub/deep/c.log", 3);
        fs.add_dir("/t/empty");
        fs
    }

    fn names(walker: Walker<'_, &MemFileSystem>) -> Vec<String> {
        walker
            .map(|e| e.unwrap().full_path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn recursive_walk_is_pre_order_and_complete() {
        let fs = tree();
        let got = names(entries(&fs, "/t", true).unwrap());
        assert_eq!(got.len(), 6);
        let pos = |p: &str| got.iter().position(|g| g == p).unwrap();
        assert!(pos("/t/sub") < pos("/t/sub/b.TXT"));
        assert!(pos("/t/sub") < pos("/t/sub/deep"));
        assert!(pos("/t/sub/deep") < pos("/t/sub/deep/c.log"));
        assert!(!got.contains(&"/t".to_string()));
    }

    #[test]
    fn non_recursive_lists_one_level() {
        let fs = tree();
        let mut got = names(entries(&fs, "/t", false).unwrap());
        got.sort();
        assert_eq!(got, vec!["/t/a.txt", "/t/empty", "/t/sub"]);
        assert_eq!(fs.total_calls(Op::List), 1);
    }

    #[test]
    fn pattern_filters_yield_but_not_descent() {
        let fs = tree();
        let walker = walk(&fs, TraversalRequest::new("/t").recursive(true).pattern("*.txt")).unwrap();
        let mut got = names(walker);
        got.sort();
        assert_eq!(got, vec!["/t/a.txt", "/t/sub/b.TXT"]);
    }

    #[test]
    fn question_mark_matches_single_char() {
        let fs = tree();
        let walker = walk(&fs, TraversalRequest::new("/t").recursive(true).pattern("?.log")).unwrap();
        assert_eq!(names(walker), vec!["/t/sub/deep/c.log"]);
    }

    #[test]
    fn brackets_are_literal() {
        let fs = MemFileSystem::new();
        fs.add_file("/t/[x].txt", 1);
        fs.add_file("/t/x.txt", 1);
        let walker = walk(&fs, TraversalRequest::new("/t").pattern("[x]*")).unwrap();
        assert_eq!(names(walker), vec!["/t/[x].txt"]);
    }

    #[test]
    fn files_and_dirs_only() {
        let fs = tree();
        let files = names(files(&fs, "/t", true).unwrap());
        assert_eq!(files.len(), 3);
        let dirs = names(directories(&fs, "/t", true).unwrap());
        assert_eq!(dirs.len(), 3);
    }

    #[test]
    fn reparse_points_are_yielded_but_not_followed_by_default() {
        let fs = tree();
        fs.add_link("/t/link", true);
        let got = names(entries(&fs, "/t", true).unwrap());
        assert!(got.contains(&"/t/link".to_string()));
        assert_eq!(fs.calls(Op::List, "/t/link"), 0);

        let walker = walk(&fs, TraversalRequest::new("/t").recursive(true).skip_reparse_points(false)).unwrap();
        let _ = names(walker);
        assert_eq!(fs.calls(Op::List, "/t/link"), 1);
    }

    #[test]
    fn listing_error_ends_walk_unless_tolerated() {
        let fs = tree();
        fs.fail(Op::List, "/t/sub", NativeCode::AccessDenied, None);

        let results: Vec<_> = entries(&fs, "/t", true).unwrap().collect();
        let last = results.last().unwrap();
        assert!(matches!(
            last,
            Err(DirTreeError::ListingFailed { path, code: NativeCode::AccessDenied }) if path == Path::new("/t/sub")
        ));

        let walker = walk(&fs, TraversalRequest::new("/t").recursive(true).continue_on_error(true)).unwrap();
        let got = names(walker);
        assert!(got.contains(&"/t/sub".to_string()));
        assert!(got.contains(&"/t/empty".to_string()));
        assert!(!got.iter().any(|p| p.starts_with("/t/sub/")));
    }

    #[test]
    fn vanished_child_directory_during_recursive_walk() {
        let fs = tree();
        fs.fail(Op::List, "/t/sub/deep", NativeCode::PathNotFound, None);

        let results: Vec<_> = entries(&fs, "/t", true).unwrap().collect();
        assert!(matches!(
            results.last(),
            Some(Err(DirTreeError::ListingFailed { path, code: NativeCode::PathNotFound })) if path == Path::new("/t/sub/deep")
        ));
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);

        let walker = walk(&fs, TraversalRequest::new("/t").recursive(true).continue_on_error(true)).unwrap();
        let got = names(walker);
        assert!(got.contains(&"/t/sub/deep".to_string()));
        assert!(got.contains(&"/t/a.txt".to_string()));
        assert!(!got.contains(&"/t/sub/deep/c.log".to_string()));
        assert_eq!(got.len(), 5);
    }

    #[test]
    fn error_filter_can_skip_a_subtree() {
        let fs = tree();
        fs.fail(Op::List, "/t/sub", NativeCode::AccessDenied, None);
        let walker = walk(
            &fs,
            TraversalRequest::new("/t")
                .recursive(true)
                .error_filter(|_, e| e.code == NativeCode::AccessDenied),
        )
        .unwrap();
        let got: Vec<_> = walker.collect();
        assert!(got.iter().all(|r| r.is_ok()));
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn missing_root_is_listing_failure() {
        let fs = MemFileSystem::new();
        let mut walker = entries(&fs, "/nope", true).unwrap();
        assert!(matches!(walker.next(), Some(Err(DirTreeError::ListingFailed { .. }))));
        assert!(walker.next().is_none());
    }

    #[test]
    fn count_and_empty_checks() {
        let fs = tree();
        assert_eq!(count_entries(&fs, TraversalRequest::new("/t").recursive(true)).unwrap(), 6);
        assert!(is_empty_dir(&fs, Path::new("/t/empty"), None).unwrap());
        assert!(!is_empty_dir(&fs, Path::new("/t/sub"), None).unwrap());
        assert!(matches!(
            is_empty_dir(&fs, Path::new("/t/none"), None),
            Err(DirTreeError::NotFound(_))
        ));
    }

    #[test]
    fn consumer_can_stop_early() {
        let fs = tree();
        let first: Vec<_> = entries(&fs, "/t", true).unwrap().take(1).collect();
        assert_eq!(first.len(), 1);
        assert_eq!(fs.total_calls(Op::List), 1);
    }
}
