// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tests for the `testreplay` CLI against logs left behind by real processes.

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use pretty_assertions::assert_eq;
use testreplay_metadata::ReplayExitCode;

/// Runs t1..t5 where t2 fails, crashing while t4 runs.
fn crashed_run(dir: &camino::Utf8Path) {
    let output = CrashHost::new(dir)
        .tests(["t1", "t2", "t3", "t4", "t5"])
        .fail("t2")
        .crash_at(4, "exit")
        .output();
    assert_eq!(output.exit_status.code(), Some(CRASH_EXIT_CODE), "{output}");
}

#[test]
fn skip_set_after_crash() {
    let dir = Utf8TempDir::new().unwrap();
    crashed_run(dir.path());

    let output = ReplayCli::for_test()
        .args(["skip-set", dir.path().as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "t1\nt2\nt3\n");

    let output = ReplayCli::for_test()
        .args(["skip-set", "--policy", "passed", dir.path().as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "t1\nt3\n");
}

#[test]
fn rerun_set_after_crash() {
    let dir = Utf8TempDir::new().unwrap();
    crashed_run(dir.path());
    let log_path = dir.path().join(".testreplay.log");

    let output = ReplayCli::for_test()
        .args(["rerun-set", log_path.as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "t4\n");

    let output = ReplayCli::for_test()
        .args(["rerun-set", "--policy", "passed", log_path.as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "t2\nt4\n");
}

#[test]
fn show_names_the_crashed_test() {
    let dir = Utf8TempDir::new().unwrap();
    crashed_run(dir.path());

    let output = ReplayCli::for_test()
        .args(["show", dir.path().as_str()])
        .output();
    let stdout = output.stdout_as_str();
    assert!(stdout.contains(".testreplay.log"), "{output}");
    assert!(
        stdout.lines().any(|line| line.trim() == "t4"),
        "incomplete test is listed:\n{output}"
    );
}

#[test]
fn script_from_crashed_log() {
    let dir = Utf8TempDir::new().unwrap();
    crashed_run(dir.path());
    let log_path = dir.path().join(".testreplay.log");
    let script_path = dir.path().join("resume.sh");

    ReplayCli::for_test()
        .args([
            "script",
            "--exclude-completed",
            "--command",
            "run-tests",
            "--output",
            script_path.as_str(),
            log_path.as_str(),
        ])
        .output();

    let script = std::fs::read_to_string(&script_path).unwrap();
    assert_eq!(
        script,
        "# generated by testreplay\n\
         run-tests $* \\\n  \
         't4'"
    );
}

#[test]
fn script_default_path_and_dialect() {
    let dir = Utf8TempDir::new().unwrap();
    crashed_run(dir.path());
    let log_path = dir.path().join(".testreplay.log");

    ReplayCli::for_test()
        .args(["script", "--command", "run-tests", log_path.as_str()])
        .env("TESTREPLAY_DIALECT", "bat")
        .output();

    let script = std::fs::read_to_string(dir.path().join(".testreplay.bat")).unwrap();
    assert_eq!(
        script,
        "REM generated by testreplay\n\
         run-tests %* ^\n  \"t1\" ^\n  \"t2\" ^\n  \"t3\" ^\n  \"t4\""
    );
}

#[test]
fn missing_inputs_exit_codes() {
    let dir = Utf8TempDir::new().unwrap();

    let output = ReplayCli::for_test()
        .args(["skip-set", dir.path().as_str()])
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_status.code(),
        Some(ReplayExitCode::SETUP_ERROR),
        "{output}"
    );
    assert!(
        output.stderr_as_str().contains("no execution logs found"),
        "{output}"
    );

    let output = ReplayCli::for_test()
        .args(["show", dir.path().join("missing.log").as_str()])
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_status.code(),
        Some(ReplayExitCode::LOG_READ_FAILED),
        "{output}"
    );
}
