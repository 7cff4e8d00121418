use std::fs;
use std::path::Path;

use dirtree::{DeleteOptions, DirTreeError, OsFileSystem, delete_directory, delete_file, delete_tree};
use tempfile::tempdir;
use walkdir::WalkDir;

fn populate(root: &Path) {
    fs::create_dir_all(root.join("x/y/z")).unwrap();
    fs::write(root.join("x/f1"), b"one").unwrap();
    fs::write(root.join("x/y/f2"), b"two").unwrap();
    fs::write(root.join("x/y/z/f3"), b"three").unwrap();
    fs::create_dir(root.join("empty")).unwrap();
}

fn snapshot(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap().path().display().to_string())
        .collect()
}

#[test]
fn recursive_delete_removes_everything() {
    let td = tempdir().unwrap();
    let root = td.path().join("victim");
    populate(&root);

    delete_tree(&OsFileSystem::new(), &root).unwrap();
    assert!(!root.exists());
    assert!(td.path().exists());
}

#[test]
fn non_recursive_delete_of_populated_dir_changes_nothing() {
    let td = tempdir().unwrap();
    let root = td.path().join("victim");
    populate(&root);
    let before = snapshot(&root);

    let err = delete_directory(&OsFileSystem::new(), &root, &DeleteOptions::new(false)).unwrap_err();
    assert!(matches!(err, DirTreeError::DirectoryNotEmpty(_)), "{err}");
    assert_eq!(snapshot(&root), before);
}

#[test]
fn non_recursive_delete_of_empty_dir() {
    let td = tempdir().unwrap();
    let root = td.path().join("empty");
    fs::create_dir(&root).unwrap();
    delete_directory(&OsFileSystem::new(), &root, &DeleteOptions::new(false)).unwrap();
    assert!(!root.exists());
}

#[test]
fn missing_root_depends_on_continue_if_missing() {
    let td = tempdir().unwrap();
    let root = td.path().join("gone");
    let fs_ = OsFileSystem::new();

    let err = delete_directory(&fs_, &root, &DeleteOptions::new(true)).unwrap_err();
    assert!(matches!(err, DirTreeError::NotFound(_)), "{err}");
    delete_directory(&fs_, &root, &DeleteOptions::new(true).with_continue_if_missing(true)).unwrap();
}

#[test]
fn file_root_is_not_a_directory() {
    let td = tempdir().unwrap();
    let f = td.path().join("plain");
    fs::write(&f, b"x").unwrap();
    let err = delete_tree(&OsFileSystem::new(), &f).unwrap_err();
    assert!(matches!(err, DirTreeError::NotADirectory(_)));
    assert!(f.exists());

    delete_file(&OsFileSystem::new(), &f, false, None).unwrap();
    assert!(!f.exists());
}

#[test]
fn read_only_entries_need_the_override() {
    let td = tempdir().unwrap();
    let root = td.path().join("ro");
    populate(&root);
    let locked = root.join("x/y/f2");
    let mut perms = fs::metadata(&locked).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&locked, perms).unwrap();

    let fs_ = OsFileSystem::new();
    let err = delete_tree(&fs_, &root).unwrap_err();
    assert!(matches!(err, DirTreeError::ReadOnly(ref p) if p.ends_with("f2")), "{err}");
    assert!(locked.exists());

    delete_directory(&fs_, &root, &DeleteOptions::new(true).with_ignore_read_only(true)).unwrap();
    assert!(!root.exists());
}

#[cfg(unix)]
#[test]
fn read_only_directory_is_cleared_before_emptying() {
    use std::os::unix::fs::PermissionsExt;

    let td = tempdir().unwrap();
    let root = td.path().join("locked");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("sub/file"), b"data").unwrap();
    fs::set_permissions(root.join("sub"), fs::Permissions::from_mode(0o555)).unwrap();

    let fs_ = OsFileSystem::new();
    let err = delete_tree(&fs_, &root).unwrap_err();
    assert!(matches!(err, DirTreeError::ReadOnly(_)), "{err}");

    delete_directory(&fs_, &root, &DeleteOptions::new(true).with_ignore_read_only(true)).unwrap();
    assert!(!root.exists());
}

#[cfg(unix)]
#[test]
fn symlink_children_are_removed_not_followed() {
    let td = tempdir().unwrap();
    let keep = td.path().join("keep");
    fs::create_dir(&keep).unwrap();
    fs::write(keep.join("precious"), b"!").unwrap();
    let root = td.path().join("root");
    fs::create_dir(&root).unwrap();
    std::os::unix::fs::symlink(&keep, root.join("to_keep")).unwrap();

    delete_tree(&OsFileSystem::new(), &root).unwrap();
    assert!(!root.exists());
    assert!(keep.join("precious").exists());
}
