//! Integration tests for the dataforge-run binary.
//!
//! These tests exercise the compiled binary end-to-end using `assert_cmd`.
//! A stub `dataforge` shell script stands in for the real tool.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Write an executable shell script named `dataforge` into `dir`.
#[cfg(unix)]
fn write_stub_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("dataforge");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Create a project directory containing `data/input.csv`.
fn create_fixture_project(dir: &Path) -> PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    let file = data.join("input.csv");
    fs::write(&file, "id,name\n1,alpha\n").unwrap();
    file
}

/// Build a `Command` for the dataforge-run binary with a clean environment.
fn dataforge_cmd() -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("dataforge-run");
    cmd.env("NO_COLOR", "1")
        .env_remove("DATAFORGE_EXECUTABLE")
        .env_remove("DATAFORGE_LOG")
        .env_remove("RUST_LOG");
    cmd
}

// ---------------------------------------------------------------------------
// Basic CLI tests
// ---------------------------------------------------------------------------

#[test]
fn test_help_output() {
    dataforge_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dataforge-run"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("completion"));
}

#[test]
fn test_version_flag() {
    dataforge_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dataforge-run"));
}

#[test]
fn test_completion_bash() {
    dataforge_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dataforge-run"));
}

#[test]
fn test_missing_file_fails() {
    dataforge_cmd()
        .args(["run", "/definitely/not/here.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FAILED"))
        .stderr(predicate::str::contains("cannot access"));
}

#[test]
fn test_directory_is_rejected() {
    let tmp = TempDir::new().unwrap();
    dataforge_cmd()
        .arg("run")
        .arg(tmp.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is a directory"));
}

#[test]
fn test_missing_executable_is_launch_failure() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .args(["--executable", "definitely-not-a-real-binary-7f3a9c"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FAILED"))
        .stderr(predicate::str::contains("failed to start"));
}

#[test]
fn test_missing_project_root_is_launch_failure() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .args(["--project-root", "/definitely/not/a/dir/7f3a9c"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("working directory does not exist"));
}

// ---------------------------------------------------------------------------
// Runs against a stub tool
// ---------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn test_successful_run_streams_output() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo \"flag=$1\"\necho \"processed $2\"\nexit 0");

    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .assert()
        .success()
        .stdout(predicate::str::contains("[DataForge] flag=--path"))
        .stdout(predicate::str::contains(format!(
            "[DataForge] processed {}",
            file.display()
        )))
        .stdout(predicate::str::contains(
            "DataForge execution completed successfully",
        ));
}

#[cfg(unix)]
#[test]
fn test_tool_exit_code_is_passed_through() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo 'schema mismatch' >&2\nexit 3");

    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("[DataForge] schema mismatch"))
        .stderr(predicate::str::contains(
            "DataForge execution failed with exit code: 3",
        ))
        .stderr(predicate::str::contains("FAILED").not());
}

#[cfg(unix)]
#[test]
fn test_blank_lines_not_rendered() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo one\necho\necho '   '\necho two");

    let output = dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .arg("--quiet")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "[DataForge] one\n[DataForge] two\n");
}

#[cfg(unix)]
#[test]
fn test_quiet_suppresses_summary() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo done");

    dataforge_cmd()
        .arg("--quiet")
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .assert()
        .success()
        .stdout(predicate::str::contains("[DataForge] done"))
        .stdout(predicate::str::contains("completed successfully").not());
}

#[cfg(unix)]
#[test]
fn test_project_root_is_working_directory() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo \"cwd=$(pwd -P)\"");
    let root = tmp.path().canonicalize().unwrap();

    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--project-root")
        .arg(tmp.path())
        .arg("--executable")
        .arg(&tool)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("cwd={}", root.display())));
}

#[cfg(unix)]
#[test]
fn test_config_file_in_project_root() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo \"args=$*\"");
    fs::write(
        tmp.path().join(".dataforge.yaml"),
        format!(
            "executable: {}\npathFlag: null\nextraArgs:\n  - --strict\nlabel: Forge\n",
            tool.display()
        ),
    )
    .unwrap();

    dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--project-root")
        .arg(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "[Forge] args={} --strict",
            file.display()
        )))
        .stdout(predicate::str::contains("Forge execution completed successfully"));
}

#[cfg(unix)]
#[test]
fn test_executable_from_environment() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo from-env");

    dataforge_cmd()
        .env("DATAFORGE_EXECUTABLE", &tool)
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("[DataForge] from-env"));
}

#[cfg(unix)]
#[test]
fn test_json_output() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo 'build ok'\nexit 0");

    let output = dataforge_cmd()
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["exit_code"], 0);
    assert_eq!(json["succeeded"], true);
    let lines = json["output"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["text"], "build ok");
    assert_eq!(lines[0]["stream"], "stdout");
}

#[cfg(unix)]
#[test]
fn test_log_dir_receives_log_file() {
    let tmp = TempDir::new().unwrap();
    let file = create_fixture_project(tmp.path());
    let tool = write_stub_tool(tmp.path(), "echo hi");
    let logs = tmp.path().join("logs");

    dataforge_cmd()
        .env("DATAFORGE_LOG", "info")
        .arg("--log-dir")
        .arg(&logs)
        .arg("run")
        .arg(&file)
        .arg("--executable")
        .arg(&tool)
        .assert()
        .success();

    let entries: Vec<_> = fs::read_dir(&logs).unwrap().collect();
    assert_eq!(entries.len(), 1);
    let content = fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
    assert!(content.contains("initialized for project"));
    assert!(content.contains("process exited"));
}
