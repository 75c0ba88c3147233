// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! These run the `crash-host` helper, a fake test host that records through
//! `ReplayRecorder` and can be told to die in the middle of a test, and the
//! `testreplay-dup` binary, which is the `testreplay` CLI under another name
//! so that cargo never tries to replace a running executable.

use camino_tempfile::Utf8TempDir;
use fixtures::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use test_case::test_case;
use testreplay_runner::{identity::OutcomeKind, resume::compute_skip_set};

mod cli;
mod fixtures;
mod replay_script;
mod workers;

const MOD_TESTS: [&str; 3] = ["mod1::foo", "mod1::bar", "mod2::yy"];

#[test]
fn clean_run_writes_log_and_script() {
    let dir = Utf8TempDir::new().unwrap();
    let output = CrashHost::new(dir.path()).tests(MOD_TESTS).output();
    assert!(output.exit_status.success(), "host failed:\n{output}");
    assert!(
        output
            .stderr_as_str()
            .contains(&format!("replay dir: {} (sh)", dir.path())),
        "status line is emitted:\n{output}"
    );

    let log = read_log(&dir.path().join(".testreplay.log"));
    assert_eq!(log.header().worker_id, None);
    assert_eq!(
        log.records(),
        [
            start("mod1::foo"),
            outcome("mod1::foo", OutcomeKind::Passed),
            start("mod1::bar"),
            outcome("mod1::bar", OutcomeKind::Passed),
            start("mod2::yy"),
            outcome("mod2::yy", OutcomeKind::Passed),
        ]
    );
    assert!(!log.has_torn_tail());

    let script = std::fs::read_to_string(dir.path().join(".testreplay.sh")).unwrap();
    assert_eq!(
        script,
        "# generated by testreplay\n\
         cargo test -- --exact $* \\\n  \
         'mod1::foo' \\\n  \
         'mod1::bar' \\\n  \
         'mod2::yy'"
    );
}

#[test]
fn exit_status_reflects_test_results() {
    let dir = Utf8TempDir::new().unwrap();
    let output = CrashHost::new(dir.path())
        .tests(MOD_TESTS)
        .fail("mod1::bar")
        .error("mod2::yy")
        .output();
    assert_eq!(output.exit_status.code(), Some(1), "{output}");

    let log = read_log(&dir.path().join(".testreplay.log"));
    assert_eq!(
        log.records(),
        [
            start("mod1::foo"),
            outcome("mod1::foo", OutcomeKind::Passed),
            start("mod1::bar"),
            outcome("mod1::bar", OutcomeKind::Failed),
            start("mod2::yy"),
            outcome("mod2::yy", OutcomeKind::Error),
        ]
    );

    // The script is still written, and replays every test that started.
    let script = std::fs::read_to_string(dir.path().join(".testreplay.sh")).unwrap();
    assert_eq!(script.lines().count(), 2 + MOD_TESTS.len());
}

#[test]
fn disabled_host_writes_nothing() {
    let dir = Utf8TempDir::new().unwrap();
    let output = CrashHost::disabled()
        .tests(MOD_TESTS)
        .command()
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        std::fs::read_dir(dir.path()).unwrap().count(),
        0,
        "nothing written without an output directory"
    );
}

#[test_case("exit" ; "process exit")]
#[test_case("abort" ; "process abort")]
fn crash_leaves_durable_log(mode: &str) {
    let dir = Utf8TempDir::new().unwrap();
    let output = CrashHost::new(dir.path())
        .tests(["t1", "t2", "t3", "t4"])
        .crash_at(3, mode)
        .output();
    assert!(!output.exit_status.success(), "{output}");
    if mode == "exit" {
        assert_eq!(output.exit_status.code(), Some(CRASH_EXIT_CODE), "{output}");
    }

    let log = read_log(&dir.path().join(".testreplay.log"));
    assert_eq!(
        log.records(),
        [
            start("t1"),
            outcome("t1", OutcomeKind::Passed),
            start("t2"),
            outcome("t2", OutcomeKind::Passed),
            start("t3"),
        ],
        "every record before the crash is on disk, and t4 never started"
    );
    assert!(
        !dir.path().join(".testreplay.sh").exists(),
        "no script is written when the session never finishes"
    );

    assert_eq!(identities(&compute_skip_set(&log)), ["t1", "t2"]);
}

#[test]
fn crash_during_first_test() {
    let dir = Utf8TempDir::new().unwrap();
    let output = CrashHost::new(dir.path())
        .tests(["t1", "t2"])
        .crash_at(1, "exit")
        .output();
    assert_eq!(output.exit_status.code(), Some(CRASH_EXIT_CODE), "{output}");

    let log = read_log(&dir.path().join(".testreplay.log"));
    assert_eq!(log.records(), [start("t1")]);
    assert!(compute_skip_set(&log).is_empty());
}

#[test]
fn rerun_overwrites_previous_log() {
    let dir = Utf8TempDir::new().unwrap();
    CrashHost::new(dir.path())
        .tests(["t1", "t2", "t3"])
        .crash_at(2, "exit")
        .output();
    let output = CrashHost::new(dir.path()).tests(["t2"]).output();
    assert!(output.exit_status.success(), "{output}");

    let log = read_log(&dir.path().join(".testreplay.log"));
    assert_eq!(
        log.records(),
        [start("t2"), outcome("t2", OutcomeKind::Passed)]
    );

    let script = std::fs::read_to_string(dir.path().join(".testreplay.sh")).unwrap();
    assert_eq!(
        script,
        indoc! {"
            # generated by testreplay
            cargo test -- --exact $* \\
              't2'"
        }
    );
}
