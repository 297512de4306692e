//! Integration Tests
//!
//! Each test drives the msh binary directly, either with `-c` for a single
//! command string or with a script piped to stdin. `HOME` points at a fresh
//! temporary directory so history and log files never leak between tests.

extern crate tempdir;

use std::io::Write;
use std::process::{Command, Output, Stdio};

use tempdir::TempDir;

fn run_command_string(command: &str) -> Output {
    let home = TempDir::new("msh-test").expect("unable to create temp dir");
    Command::new(env!("CARGO_BIN_EXE_msh"))
        .env("HOME", home.path())
        .args(&["-c", command])
        .output()
        .expect("failed to run msh")
}

fn run_stdin_script(script: &str) -> Output {
    let home = TempDir::new("msh-test").expect("unable to create temp dir");
    let mut child = Command::new(env!("CARGO_BIN_EXE_msh"))
        .env("HOME", home.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run msh");

    child
        .stdin
        .as_mut()
        .expect("child should have piped stdin")
        .write_all(script.as_bytes())
        .expect("failed to write to msh stdin");

    child.wait_with_output().expect("failed to wait for msh")
}

fn stdout_utf8(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_utf8(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_simple_echo() {
    let output = run_command_string("echo test");
    assert!(output.status.success());
    assert_eq!(stdout_utf8(&output), "test\n");
}

#[test]
fn test_simple_pipeline() {
    let output = run_command_string("echo needle | cat | cat");
    assert!(output.status.success());
    assert_eq!(stdout_utf8(&output), "needle\n");
}

#[test]
fn test_pipeline_filters() {
    let output = run_command_string("printf 'needle\\nhaystack\\n' | grep needle");
    assert!(output.status.success());
    assert_eq!(stdout_utf8(&output), "needle\n");
}

#[test]
fn test_command_not_found() {
    let output = run_command_string("definitely-not-a-real-command");
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("definitely-not-a-real-command: command not found"));
}

#[test]
fn test_pipeline_survives_missing_stage() {
    // The surviving downstream stage reads empty input.
    let output = run_command_string("definitely-not-a-real-command | wc -l");
    assert!(output.status.success());
    assert_eq!(stdout_utf8(&output).trim(), "0");
    assert!(stderr_utf8(&output).contains("command not found"));
}

#[test]
fn test_exit_status_zero_on_eof() {
    let output = run_stdin_script("");
    assert!(output.status.success());
    assert!(stdout_utf8(&output).contains("exit"));
}

#[test]
fn test_exit_builtin_status() {
    let output = run_command_string("exit 85");
    assert_eq!(output.status.code(), Some(85));
}

#[test]
fn test_exit_builtin_negative_status_wraps() {
    let output = run_command_string("exit -12");
    assert_eq!(output.status.code(), Some(244));
}

#[test]
fn test_quit_is_exit() {
    let output = run_command_string("quit");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_background_job_announcement() {
    let output = run_stdin_script("sleep 1 &\nexit\n");
    assert!(output.status.success());
    assert!(stdout_utf8(&output).contains("[1]  "));
}

#[test]
fn test_jobs_lists_running_background_job() {
    let output = run_stdin_script("sleep 1 &\njobs\nexit\n");
    assert!(output.status.success());
    assert!(stdout_utf8(&output).contains("[1]  Running  sleep 1"));
}

#[test]
fn test_background_job_completion_notice() {
    // The foreground sleep gives the reaper time to observe the
    // background job's exit and print its notice.
    let output = run_stdin_script("sleep 0.1 &\nsleep 0.6\nexit\n");
    assert!(output.status.success());
    let stdout = stdout_utf8(&output);
    assert!(stdout.contains("[1]  "));
    assert!(stdout.contains("done"));
}

#[test]
fn test_fg_without_jobs_reports_error() {
    let output = run_stdin_script("fg\nexit\n");
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("no such job"));
}

#[test]
fn test_kill_terminates_background_job() {
    let output = run_stdin_script("sleep 10 &\nkill %1\nsleep 0.3\njobs\nexit\n");
    assert!(output.status.success());
    assert!(!stdout_utf8(&output).contains("Running  sleep 10"));
}

#[test]
fn test_kill_defaults_to_most_recent_job() {
    let output = run_stdin_script("sleep 10 &\nkill\nsleep 0.3\njobs\nexit\n");
    assert!(output.status.success());
    assert!(!stdout_utf8(&output).contains("Running  sleep 10"));
}

#[test]
fn test_kill_without_jobs_reports_error() {
    let output = run_stdin_script("kill\nexit\n");
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("no such job"));
}

#[test]
fn test_exit_refuses_with_outstanding_jobs() {
    let output = run_stdin_script("sleep 0.5 &\nexit 7\n");
    // The refused exit leaves the loop running until end of input, which
    // exits with status 0.
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("There are stopped jobs."));
}

#[test]
fn test_kill_invalid_job_spec() {
    let output = run_stdin_script("kill %bogus\nexit\n");
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("arguments must be job IDs"));
}

#[test]
fn test_history_recall_executes_previous_command() {
    let output = run_stdin_script("echo first\n!!\nexit\n");
    assert!(output.status.success());
    let stdout = stdout_utf8(&output);
    // The recalled line is echoed before it runs again, so "first\n"
    // shows up in the echo, then in each of the two runs.
    assert!(stdout.contains("echo first"));
    assert_eq!(stdout.matches("first\n").count(), 3);
}

#[test]
fn test_history_builtin_lists_entries() {
    let output = run_stdin_script("echo one\necho two\nhistory\nexit\n");
    assert!(output.status.success());
    let stdout = stdout_utf8(&output);
    assert!(stdout.contains("[1] : echo one"));
    assert!(stdout.contains("[2] : echo two"));
}

#[test]
fn test_cd_changes_directory() {
    let output = run_stdin_script("cd /\npwd\nexit\n");
    assert!(output.status.success());
    assert!(stdout_utf8(&output).contains("/\n"));
}

#[test]
fn test_cd_missing_directory_reports_error() {
    let output = run_stdin_script("cd /definitely-not-a-real-dir\nexit\n");
    assert!(output.status.success());
    assert!(stderr_utf8(&output).contains("cd: /definitely-not-a-real-dir"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new("msh-test").expect("unable to create temp dir");
    let output = Command::new(env!("CARGO_BIN_EXE_msh"))
        .env("HOME", home.path())
        .arg("--version")
        .output()
        .expect("failed to run msh");
    assert!(output.status.success());
    assert!(stdout_utf8(&output).contains(env!("CARGO_PKG_VERSION")));
}
