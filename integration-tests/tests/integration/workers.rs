// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use testreplay_runner::{
    log::ExecutionLog,
    partition::discover_logs,
    resume::{ResumePolicy, ResumeState},
};

const WORKERS: [&str; 4] = ["gw0", "gw1", "gw2", "gw3"];
const TESTS_PER_WORKER: usize = 5;

fn worker_tests(worker: &str) -> Vec<String> {
    (0..TESTS_PER_WORKER)
        .map(|i| format!("{worker}::test_{i}"))
        .collect()
}

#[test]
fn concurrent_workers_write_disjoint_logs() {
    let temp_dir = Utf8TempDir::new().unwrap();
    // Not created ahead of time: every worker races to create it.
    let dir = temp_dir.path().join("nested/replay");

    let children: Vec<_> = WORKERS
        .iter()
        .map(|worker| {
            CrashHost::new(&dir)
                .worker_id(worker)
                .tests(worker_tests(worker))
                .command()
                .stdout(std::process::Stdio::null())
                .spawn()
                .unwrap()
        })
        .collect();
    for mut child in children {
        assert!(child.wait().unwrap().success());
    }

    let log_paths = discover_logs(&dir).unwrap();
    let file_names: Vec<_> = log_paths
        .iter()
        .map(|path| path.file_name().unwrap())
        .collect();
    assert_eq!(
        file_names,
        [
            ".testreplay-gw0.log",
            ".testreplay-gw1.log",
            ".testreplay-gw2.log",
            ".testreplay-gw3.log",
        ]
    );

    let logs: Vec<_> = log_paths
        .iter()
        .map(|path| ExecutionLog::read(path).unwrap())
        .collect();
    for (log, worker) in logs.iter().zip(WORKERS) {
        assert_eq!(
            log.header().worker_id.as_ref().map(|id| id.as_str()),
            Some(worker)
        );
        assert_eq!(identities(log.started()), worker_tests(worker));
        assert!(
            dir.join(format!(".testreplay-{worker}.sh")).is_file(),
            "each worker writes its own script"
        );
    }

    // The union of all logs is exactly the full test set, with nothing
    // recorded twice.
    let total: usize = logs.iter().map(|log| log.started().count()).sum();
    let union: BTreeSet<_> = logs
        .iter()
        .flat_map(|log| log.started().map(|test| test.as_str().to_owned()))
        .collect();
    let expected: BTreeSet<_> = WORKERS.iter().flat_map(|w| worker_tests(w)).collect();
    assert_eq!(total, expected.len());
    assert_eq!(union, expected);

    let state = ResumeState::from_logs(&logs, ResumePolicy::Completed);
    assert_eq!(state.skip().count(), expected.len());
    assert_eq!(state.outstanding().count(), 0);
}

#[test]
fn one_worker_crashes() {
    let dir = Utf8TempDir::new().unwrap();

    let output = CrashHost::new(dir.path())
        .worker_id("gw0")
        .tests(["a::one", "a::two"])
        .output();
    assert!(output.exit_status.success(), "{output}");
    let output = CrashHost::new(dir.path())
        .worker_id("gw1")
        .tests(["b::one", "b::two", "b::three"])
        .crash_at(2, "exit")
        .output();
    assert_eq!(output.exit_status.code(), Some(CRASH_EXIT_CODE), "{output}");

    let output = ReplayCli::for_test()
        .args(["skip-set", dir.path().as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "a::one\na::two\nb::one\n");

    let output = ReplayCli::for_test()
        .args(["rerun-set", dir.path().as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "b::two\n");
}
