use std::fs;

use dirtree::{OsFileSystem, PruneOptions, prune_empty};
use tempfile::tempdir;

#[test]
fn prunes_exactly_the_empty_subtrees() {
    let td = tempdir().unwrap();
    let root = fs::canonicalize(td.path()).unwrap();
    fs::create_dir_all(root.join("a/b/c")).unwrap();
    fs::create_dir_all(root.join("keep/sub")).unwrap();
    fs::write(root.join("keep/sub/file"), b"x").unwrap();
    fs::create_dir_all(root.join("keep/hollow")).unwrap();

    let report = prune_empty(&OsFileSystem::new(), &root, &PruneOptions::default()).unwrap();
    assert_eq!(report.removed.len(), 4);
    assert!(!root.join("a").exists());
    assert!(!root.join("keep/hollow").exists());
    assert!(root.join("keep/sub/file").exists());
    assert!(root.exists());
}

#[test]
fn non_recursive_prune_leaves_nested_empties() {
    let td = tempdir().unwrap();
    let root = td.path();
    fs::create_dir_all(root.join("a/b")).unwrap();
    fs::create_dir(root.join("solo")).unwrap();

    let report = prune_empty(&OsFileSystem::new(), root, &PruneOptions::new(false)).unwrap();
    assert_eq!(report.removed.len(), 1);
    assert!(!root.join("solo").exists());
    assert!(root.join("a/b").exists());
}

#[test]
fn empty_root_survives() {
    let td = tempdir().unwrap();
    let report = prune_empty(&OsFileSystem::new(), td.path(), &PruneOptions::default()).unwrap();
    assert!(report.removed.is_empty());
    assert!(td.path().exists());
}

#[cfg(unix)]
#[test]
fn symlinked_empty_directories_are_kept() {
    let td = tempdir().unwrap();
    let target = td.path().join("target");
    fs::create_dir(&target).unwrap();
    let root = td.path().join("root");
    fs::create_dir(&root).unwrap();
    std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

    let report = prune_empty(&OsFileSystem::new(), &root, &PruneOptions::default()).unwrap();
    assert!(report.removed.is_empty());
    assert!(fs::symlink_metadata(root.join("link")).is_ok());
    assert!(target.exists());
}
