use std::{fs::read_to_string, process::Command};

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::predicate;

fn snap() -> Command {
    Command::cargo_bin("snap").unwrap()
}

#[test]
fn init_creates_repository_at_path() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("demo");

    snap()
        .arg("init")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "Initialized empty Git repository in ",
        ))
        .stdout(predicate::str::contains(
            target.join(".git").display().to_string(),
        ));

    assert_eq!(
        read_to_string(target.join(".git/HEAD"))?,
        "ref: refs/heads/master\n"
    );
    let config = read_to_string(target.join(".git/config"))?;
    assert!(config.contains("[core]"));
    assert!(config.contains("bare = false"));
    for dir in ["branches", "objects", "refs/tags", "refs/heads"] {
        assert!(target.join(".git").join(dir).is_dir(), "missing {}", dir);
    }
    Ok(())
}

#[test]
fn init_defaults_to_current_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    snap().current_dir(dir.path()).arg("init").assert().success();
    assert!(dir.path().join(".git/config").is_file());

    let other = tempfile::tempdir()?;
    snap()
        .current_dir(other.path())
        .args(["init", ""])
        .assert()
        .success();
    assert!(other.path().join(".git/description").is_file());
    Ok(())
}

#[test]
fn init_twice_succeeds() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    snap().arg("init").arg(dir.path()).assert().success();
    std::fs::write(dir.path().join(".git/objects/extra"), "kept")?;

    snap().arg("init").arg(dir.path()).assert().success();
    assert_eq!(read_to_string(dir.path().join(".git/objects/extra"))?, "kept");
    Ok(())
}

#[test]
fn init_failure_exits_with_io_status() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "")?;

    snap()
        .arg("init")
        .arg(blocker.join("repo"))
        .assert()
        .code(74)
        .stderr(predicate::str::starts_with("fatal: "));
    Ok(())
}

#[test]
fn placeholder_commands_do_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    for cmd in [
        "add",
        "cat-file",
        "check-ignore",
        "checkout",
        "commit",
        "hash-object",
        "log",
        "ls-files",
        "ls-tree",
        "rev-parse",
        "rm",
        "show-ref",
        "status",
        "tag",
    ] {
        snap()
            .current_dir(dir.path())
            .args([cmd, "anything", "--verbose"])
            .assert()
            .success()
            .stdout("");
    }
    assert!(!dir.path().join(".git").exists());
    Ok(())
}

#[test]
fn no_arguments_prints_usage() {
    snap()
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn unknown_command_fails() {
    snap()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("frobnicate"));
}
