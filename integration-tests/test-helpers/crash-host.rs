// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fake test host that drives a `ReplayRecorder` over a list of test names,
//! and can be told to die abruptly when a given test starts.
//!
//! Recording is configured through the usual `TESTREPLAY_*` environment
//! variables. Test names are positional arguments, so a replay script whose
//! command is this binary re-runs the same tests.

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use testreplay_runner::{
    config::SessionConfig,
    identity::{OutcomeKind, TestIdentity},
    session::{ReplayRecorder, SessionHooks},
};

/// Exit code used for `--crash-mode exit`.
const CRASH_EXIT_CODE: i32 = 17;

#[derive(Debug, Parser)]
struct Args {
    /// Terminate the process as soon as the Nth test (1-based) has started
    #[arg(long, value_name = "N")]
    crash_at: Option<usize>,

    /// How to terminate the process
    #[arg(long, value_enum, default_value_t)]
    crash_mode: CrashMode,

    /// Tests that fail
    #[arg(long = "fail", value_name = "TEST")]
    failing: Vec<String>,

    /// Tests that error out
    #[arg(long = "error", value_name = "TEST")]
    erroring: Vec<String>,

    /// Tests to run, in order
    tests: Vec<String>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum CrashMode {
    /// Exit immediately without running destructors or finishing the session.
    #[default]
    Exit,

    /// Abort the process.
    Abort,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let args = Args::parse();
    let config = SessionConfig::from_env()?;

    let mut recorder = ReplayRecorder::new();
    recorder.on_session_start(&config)?;

    let mut any_failed = false;
    for (i, name) in args.tests.iter().enumerate() {
        let test = TestIdentity::new(name);
        recorder.on_test_start(&test)?;

        if args.crash_at == Some(i + 1) {
            match args.crash_mode {
                CrashMode::Exit => std::process::exit(CRASH_EXIT_CODE),
                CrashMode::Abort => std::process::abort(),
            }
        }

        let outcome = if args.failing.contains(name) {
            OutcomeKind::Failed
        } else if args.erroring.contains(name) {
            OutcomeKind::Error
        } else {
            OutcomeKind::Passed
        };
        any_failed |= matches!(outcome, OutcomeKind::Failed | OutcomeKind::Error);
        println!("{name} ... {outcome}");
        recorder.on_test_finish(&test, outcome)?;
    }

    recorder.on_session_finish().log();

    // The exit status reflects test results only.
    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}
