use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use dirtree::{DirTreeError, OsFileSystem, TraversalRequest, count_entries, files, walk};
use tempfile::tempdir;
use walkdir::WalkDir;

fn build_tree(base: &Path) {
    fs::create_dir_all(base.join("a/b/c")).unwrap();
    fs::create_dir_all(base.join("d")).unwrap();
    fs::write(base.join("top.txt"), b"top").unwrap();
    fs::write(base.join("a/one.log"), b"1").unwrap();
    fs::write(base.join("a/b/two.txt"), b"22").unwrap();
    fs::write(base.join("a/b/c/three.TXT"), b"333").unwrap();
}

#[test]
fn recursive_walk_matches_walkdir_in_pre_order() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    build_tree(&base);

    let fs_ = OsFileSystem::new();
    let walked: Vec<PathBuf> = walk(fs_, TraversalRequest::new(&base).recursive(true))
        .unwrap()
        .map(|e| e.unwrap().full_path)
        .collect();

    let expected: BTreeSet<PathBuf> = WalkDir::new(&base)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();
    let got: BTreeSet<PathBuf> = walked.iter().cloned().collect();
    assert_eq!(got, expected);
    assert_eq!(walked.len(), expected.len(), "each entry exactly once");

    // every directory appears before anything below it
    for (i, p) in walked.iter().enumerate() {
        if let Some(parent) = p.parent().filter(|par| *par != base) {
            let pos = walked.iter().position(|q| q == parent).unwrap();
            assert!(pos < i, "{} listed before its parent", p.display());
        }
    }
}

#[test]
fn pattern_is_case_insensitive_and_files_only() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    build_tree(&base);

    let names: BTreeSet<String> = walk(
        OsFileSystem::new(),
        TraversalRequest::new(&base)
            .recursive(true)
            .files(true)
            .pattern("*.txt"),
    )
    .unwrap()
    .map(|e| e.unwrap().name)
    .collect();
    let expected: BTreeSet<String> = ["top.txt", "two.txt", "three.TXT"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names, expected);
}

#[test]
fn non_recursive_lists_only_children() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    build_tree(&base);

    let n = count_entries(OsFileSystem::new(), TraversalRequest::new(&base)).unwrap();
    assert_eq!(n, 3);
    let only_files: Vec<_> = files(OsFileSystem::new(), &base, false)
        .unwrap()
        .map(|e| e.unwrap().name)
        .collect();
    assert_eq!(only_files, vec!["top.txt".to_string()]);
}

#[test]
fn missing_root_fails_listing() {
    let td = tempdir().unwrap();
    let missing = td.path().join("nope");
    let mut walker = walk(OsFileSystem::new(), TraversalRequest::new(&missing)).unwrap();
    assert!(matches!(
        walker.next(),
        Some(Err(DirTreeError::ListingFailed { .. }))
    ));
    assert!(walker.next().is_none());
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_listed_but_not_entered() {
    let td = tempdir().unwrap();
    let base = fs::canonicalize(td.path()).unwrap();
    let outside = base.join("outside");
    fs::create_dir_all(outside.join("inner")).unwrap();
    let root = base.join("root");
    fs::create_dir(&root).unwrap();
    std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

    let entries: Vec<_> = walk(OsFileSystem::new(), TraversalRequest::new(&root).recursive(true))
        .unwrap()
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_reparse_point);
    assert!(entries[0].is_directory);

    let followed = walk(
        OsFileSystem::new(),
        TraversalRequest::new(&root)
            .recursive(true)
            .skip_reparse_points(false),
    )
    .unwrap()
    .count();
    assert_eq!(followed, 2);
}
