//! Exit-status mirroring and the no-compiler baseline.

#![allow(deprecated)] // Command::cargo_bin is deprecated but still functional

use std::fs;
use std::os::unix::process::ExitStatusExt;

use assert_cmd::Command;
use nix::sys::signal::Signal;
use tempfile::TempDir;

fn basset(output: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("basset").unwrap();
    cmd.arg("--output").arg(output);
    cmd
}

#[test]
fn test_exit_code_is_mirrored() {
    let scratch = TempDir::new().unwrap();
    basset(&scratch.path().join("db.json"))
        .args(["--", "sh", "-c", "exit 42"])
        .assert()
        .code(42);
}

#[test]
fn test_successful_build_exits_zero() {
    let scratch = TempDir::new().unwrap();
    basset(&scratch.path().join("db.json"))
        .args(["--", "true"])
        .assert()
        .success();
}

#[test]
fn test_failing_build_exit_code_is_mirrored() {
    let scratch = TempDir::new().unwrap();
    basset(&scratch.path().join("db.json"))
        .args(["--", "false"])
        .assert()
        .code(1);
}

#[test]
fn test_killing_signal_is_mirrored() {
    let scratch = TempDir::new().unwrap();
    let output = basset(&scratch.path().join("db.json"))
        .args(["--", "sh", "-c", "kill -TERM $$"])
        .output()
        .unwrap();

    // Killed by the same signal, not a plain exit code.
    assert_eq!(output.status.code(), None);
    assert_eq!(output.status.signal(), Some(Signal::SIGTERM as i32));
}

#[test]
fn test_build_without_compilers_writes_empty_database() {
    let scratch = TempDir::new().unwrap();
    let db = scratch.path().join("db.json");
    basset(&db).args(["--", "true"]).assert().success();

    assert_eq!(fs::read_to_string(&db).unwrap(), "[]\n");
}

#[test]
fn test_unrunnable_command_exits_nonzero() {
    let scratch = TempDir::new().unwrap();
    let output = basset(&scratch.path().join("db.json"))
        .args(["--", "/nonexistent/definitely-not-a-binary"])
        .output()
        .unwrap();

    assert_ne!(output.status.code(), Some(0));
}

#[test]
fn test_malformed_prior_database_aborts_before_the_build() {
    let scratch = TempDir::new().unwrap();
    let db = scratch.path().join("db.json");
    fs::write(&db, "{not json").unwrap();

    let sentinel = scratch.path().join("ran");
    let output = basset(&db)
        .args(["--", "touch", sentinel.to_str().unwrap()])
        .output()
        .unwrap();

    assert_ne!(output.status.code(), Some(0));
    assert!(!sentinel.exists(), "the build must not have been launched");
    // The malformed input must not be overwritten.
    assert_eq!(fs::read_to_string(&db).unwrap(), "{not json");
}
