use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// Binary invocation isolated from the user's real config.
fn dirtree(cfg_dir: &Path) -> Command {
    let cfg = cfg_dir.join("config.xml");
    if !cfg.exists() {
        fs::write(&cfg, "<config><log_level>quiet</log_level></config>").unwrap();
    }
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("dirtree"));
    cmd.env("DIRTREE_CONFIG", &cfg);
    cmd
}

fn sample(tmp: &TempDir) {
    tmp.child("tree/a/one.txt").write_str("1").unwrap();
    tmp.child("tree/a/b/two.txt").write_str("22").unwrap();
    tmp.child("tree/c").create_dir_all().unwrap();
}

#[test]
fn list_prints_one_path_per_line() {
    let tmp = TempDir::new().unwrap();
    let cfg = TempDir::new().unwrap();
    sample(&tmp);

    let out = dirtree(cfg.path())
        .args(["list", "-r", "--files-only"])
        .arg(tmp.child("tree").path())
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut names: Vec<&str> = stdout
        .lines()
        .map(|l| l.rsplit(['/', '\\']).next().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["one.txt", "two.txt"]);
}

#[test]
fn delete_recursive_and_refusal() {
    let tmp = TempDir::new().unwrap();
    let cfg = TempDir::new().unwrap();
    sample(&tmp);
    let tree = tmp.child("tree");

    dirtree(cfg.path())
        .arg("delete")
        .arg(tree.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("not empty"));
    tree.child("a/one.txt").assert(predicate::path::exists());

    dirtree(cfg.path())
        .args(["delete", "-r"])
        .arg(tree.path())
        .assert()
        .success();
    tree.assert(predicate::path::missing());

    dirtree(cfg.path())
        .args(["delete", "--missing-ok"])
        .arg(tree.path())
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn delete_of_file_link_removes_only_the_link() {
    let tmp = TempDir::new().unwrap();
    let cfg = TempDir::new().unwrap();
    let target = tmp.child("target.txt");
    target.write_str("keep").unwrap();
    let link = tmp.child("link.txt");
    std::os::unix::fs::symlink(target.path(), link.path()).unwrap();

    dirtree(cfg.path()).arg("delete").arg(link.path()).assert().success();
    assert!(fs::symlink_metadata(link.path()).is_err());
    target.assert("keep");
}

#[test]
fn copy_move_and_prune_round_trip() {
    let tmp = TempDir::new().unwrap();
    let cfg = TempDir::new().unwrap();
    sample(&tmp);

    dirtree(cfg.path())
        .arg("copy")
        .arg(tmp.child("tree").path())
        .arg(tmp.child("copy").path())
        .assert()
        .success();
    tmp.child("copy/a/b/two.txt").assert("22");
    tmp.child("tree/a/b/two.txt").assert(predicate::path::exists());

    dirtree(cfg.path())
        .arg("move")
        .arg(tmp.child("copy").path())
        .arg(tmp.child("moved").path())
        .assert()
        .success();
    tmp.child("copy").assert(predicate::path::missing());
    tmp.child("moved/a/one.txt").assert("1");

    dirtree(cfg.path())
        .args(["prune", "-r"])
        .arg(tmp.child("moved").path())
        .assert()
        .success();
    tmp.child("moved/c").assert(predicate::path::missing());
    tmp.child("moved/a/b/two.txt").assert(predicate::path::exists());
}

#[test]
fn copy_onto_itself_fails() {
    let tmp = TempDir::new().unwrap();
    let cfg = TempDir::new().unwrap();
    sample(&tmp);
    let tree = tmp.child("tree");

    dirtree(cfg.path())
        .arg("copy")
        .arg(tree.path())
        .arg(tree.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("same path"));
}

#[test]
fn print_config_reports_env_path() {
    let cfg = TempDir::new().unwrap();
    dirtree(cfg.path())
        .arg("--print-config")
        .assert()
        .success()
        .stderr(predicate::str::contains("DIRTREE_CONFIG"));
}

#[test]
fn missing_command_is_an_error() {
    let cfg = TempDir::new().unwrap();
    dirtree(cfg.path()).assert().failure();
}
