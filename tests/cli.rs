use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn bin() -> Command {
    let path = assert_cmd::cargo::cargo_bin!("comfy-stack");
    let mut cmd = Command::new(path);
    cmd.env_remove("HF_TOKEN").env_remove("RUST_LOG");
    cmd
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn dry_run_install_into_absent_workspace_changes_nothing() {
    let temp = tempdir().unwrap();
    let ws = temp.path().join("ws");

    let output = bin()
        .args(["install", "--asset-set", "A", "--dry-run", "--path"])
        .arg(&ws)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent"));
    let fetches = stderr
        .lines()
        .filter(|line| line.contains("DRYRUN:") && line.contains("huggingface-cli download"))
        .count();
    assert_eq!(fetches, 1 + 2 + 1);
    assert!(!ws.exists());
    assert!(listing(temp.path()).is_empty());
}

#[test]
fn foreign_workspace_without_force_merge_is_refused() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("notes.txt"), "mine").unwrap();

    bin()
        .args(["install", "--path"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(contains("--force-merge"));

    assert_eq!(listing(temp.path()), vec!["notes.txt"]);
    assert_eq!(fs::read_to_string(temp.path().join("notes.txt")).unwrap(), "mine");
}

#[test]
fn dry_run_force_merge_plans_backup() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("notes.txt"), "mine").unwrap();

    bin()
        .args(["install", "--force-merge", "--dry-run", "--path"])
        .arg(temp.path())
        .assert()
        .success()
        .stderr(contains("backup notes.txt"))
        .stderr(contains("[dry run] Review required"))
        .stderr(contains("git clone"));

    assert_eq!(listing(temp.path()), vec!["notes.txt"]);
}

#[test]
fn unknown_asset_set_is_a_configuration_error() {
    let temp = tempdir().unwrap();

    bin()
        .args(["install", "--asset-set", "Z", "--dry-run", "--path"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(contains("unknown asset set"));
}

#[test]
fn models_requires_asset_set() {
    let temp = tempdir().unwrap();

    bin()
        .args(["models", "--dry-run", "--path"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(contains("--asset-set"));
}

#[test]
fn start_without_environment_fails() {
    let temp = tempdir().unwrap();

    bin()
        .args(["start", "--dry-run", "--path"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(contains("run `install` first"));
}

#[test]
fn port_without_start_is_rejected() {
    let temp = tempdir().unwrap();

    bin()
        .args(["install", "--port", "9000", "--dry-run", "--path"])
        .arg(temp.path())
        .assert()
        .code(1)
        .stderr(contains("--start"));
}
