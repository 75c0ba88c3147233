// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs generated scripts for real. POSIX shell only.

#![cfg(unix)]

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use pretty_assertions::assert_eq;
use std::process::Command;
use testreplay_runner::{
    config::{COMMAND_ENV, DIR_ENV, WORKER_ID_ENV},
    identity::OutcomeKind,
};

const TRICKY_TESTS: [&str; 4] = [
    "mod1::plain",
    "mod1::it's quoted",
    "mod2::with space",
    "mod2::$HOME",
];

/// Runs the script at `script` with `sh`, recording into `replay_dir`.
fn run_script(script: &camino::Utf8Path, replay_dir: &camino::Utf8Path) -> ProcessOutput {
    let mut command = Command::new("sh");
    command
        .arg(script.as_str())
        .env(DIR_ENV, replay_dir.as_str())
        .env_remove(WORKER_ID_ENV)
        .env_remove(COMMAND_ENV);
    ProcessOutput::from_command(command)
}

#[test]
fn replay_script_reruns_same_tests() {
    let temp_dir = Utf8TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");

    let output = CrashHost::new(&first)
        .tests(TRICKY_TESTS)
        .env(COMMAND_ENV, &shell_words::quote(crash_host_bin()))
        .output();
    assert!(output.exit_status.success(), "{output}");

    let script = first.join(".testreplay.sh");
    let output = run_script(&script, &second);
    assert!(output.exit_status.success(), "{output}");

    let original = read_log(&first.join(".testreplay.log"));
    let replayed = read_log(&second.join(".testreplay.log"));
    assert_eq!(identities(replayed.started()), TRICKY_TESTS);
    assert_eq!(replayed.records(), original.records());
}

#[test]
fn crash_script_replays_up_to_crash() {
    let temp_dir = Utf8TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");

    let output = CrashHost::new(&first)
        .tests(["t1", "t2", "t3", "t4"])
        .crash_at(3, "exit")
        .output();
    assert_eq!(output.exit_status.code(), Some(CRASH_EXIT_CODE), "{output}");

    // Materialize a script from the crashed log, pointing at the host.
    let script = first.join("crashed.sh");
    let host_command = shell_words::quote(crash_host_bin()).into_owned();
    ReplayCli::for_test()
        .args([
            "script",
            "--command",
            host_command.as_str(),
            "--output",
            script.as_str(),
            first.join(".testreplay.log").as_str(),
        ])
        .output();

    let output = run_script(&script, &second);
    assert!(output.exit_status.success(), "{output}");
    let replayed = read_log(&second.join(".testreplay.log"));
    assert_eq!(identities(replayed.started()), ["t1", "t2", "t3"]);
}

#[test]
fn script_forwards_its_arguments() {
    let temp_dir = Utf8TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");

    CrashHost::new(&first)
        .tests(["t1", "t2"])
        .env(COMMAND_ENV, &shell_words::quote(crash_host_bin()))
        .output();

    // Arguments passed to the script land ahead of the test list.
    let mut command = Command::new("sh");
    command
        .arg(first.join(".testreplay.sh").as_str())
        .args(["--fail", "t2"])
        .env(DIR_ENV, second.as_str())
        .env_remove(WORKER_ID_ENV)
        .env_remove(COMMAND_ENV);
    let output = ProcessOutput::from_command(command);
    assert_eq!(output.exit_status.code(), Some(1), "{output}");

    let replayed = read_log(&second.join(".testreplay.log"));
    assert_eq!(
        replayed.records(),
        [
            start("t1"),
            outcome("t1", OutcomeKind::Passed),
            start("t2"),
            outcome("t2", OutcomeKind::Failed),
        ]
    );
}
