//! CLI integration tests

use std::io::Write;
use std::process::{Command, Stdio};

fn mindmirror_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_mindmirror"))
}

#[test]
fn help_output() {
    let output = mindmirror_bin()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("check-in"));
    assert!(stdout.contains("--duration"));
    assert!(stdout.contains("--upload"));
    assert!(stdout.contains("--reflection"));
    assert!(stdout.contains("--skip-convert"));
    assert!(stdout.contains("--yes"));
}

#[test]
fn version_output() {
    let output = mindmirror_bin()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mindmirror"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn config_path_command() {
    let output = mindmirror_bin()
        .args(["config", "path"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mindmirror"));
    assert!(stdout.contains("config.toml"));
}

#[test]
fn config_help() {
    let output = mindmirror_bin()
        .args(["config", "--help"])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("set"));
    assert!(stdout.contains("get"));
    assert!(stdout.contains("list"));
    assert!(stdout.contains("path"));
}

#[test]
fn config_get_unknown_key() {
    let output = mindmirror_bin()
        .args(["config", "get", "unknown_key"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown key"), "got: {}", stderr);
}

#[test]
fn config_set_invalid_duration() {
    let output = mindmirror_bin()
        .args(["config", "set", "duration", "forever"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duration"), "got: {}", stderr);
}

#[test]
fn config_set_and_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let set = mindmirror_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .args(["config", "set", "duration", "20s"])
        .output()
        .expect("Failed to execute command");
    assert!(set.status.success());

    let get = mindmirror_bin()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .args(["config", "get", "duration"])
        .output()
        .expect("Failed to execute command");
    assert!(get.status.success());
    assert!(String::from_utf8_lossy(&get.stdout).contains("20s"));
}

#[test]
fn invalid_duration_error() {
    let output = mindmirror_bin()
        .args(["--duration", "invalid", "--yes"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid duration"), "got: {}", stderr);
}

#[test]
fn declined_consent_exits_without_touching_devices() {
    let mut child = mindmirror_bin()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn command");

    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(b"n\n")
        .expect("write consent answer");

    let output = child.wait_with_output().expect("Failed to wait for command");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cancelled"), "got: {}", stderr);
}

#[test]
fn closed_stdin_counts_as_declined_consent() {
    let output = mindmirror_bin()
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

#[test]
fn upload_missing_file_error() {
    let output = mindmirror_bin()
        .args(["--yes", "--upload", "/nonexistent/checkin.mp4"])
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot read"), "got: {}", stderr);
}

#[test]
fn upload_wrong_file_type_names_required_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"not a video").unwrap();

    let output = mindmirror_bin()
        .args(["--yes", "--skip-convert", "--upload"])
        .arg(&path)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("video/mp4"), "got: {}", stderr);
}
