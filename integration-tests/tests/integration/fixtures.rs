// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use std::{
    borrow::Cow,
    collections::HashMap,
    ffi::OsString,
    fmt,
    process::{Command, ExitStatus},
};
use testreplay_runner::{
    config::{COMMAND_ENV, DIALECT_ENV, DIR_ENV, WORKER_ID_ENV},
    identity::{OutcomeKind, TestIdentity},
    log::{EventRecord, ExecutionLog},
};

/// Exit code `crash-host` uses for `--crash-mode exit`.
pub const CRASH_EXIT_CODE: i32 = 17;

pub fn crash_host_bin() -> &'static str {
    env!("CARGO_BIN_EXE_crash-host")
}

/// Builder for a run of the `crash-host` helper.
#[derive(Clone, Debug)]
pub struct CrashHost {
    args: Vec<String>,
    envs: HashMap<OsString, OsString>,
}

impl CrashHost {
    /// Creates a host that records into `dir`.
    pub fn new(dir: &Utf8Path) -> Self {
        let mut envs = HashMap::new();
        envs.insert(DIR_ENV.into(), dir.as_str().into());
        Self {
            args: Vec::new(),
            envs,
        }
    }

    /// Creates a host with recording disabled.
    pub fn disabled() -> Self {
        Self {
            args: Vec::new(),
            envs: HashMap::new(),
        }
    }

    pub fn tests(&mut self, tests: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(tests.into_iter().map(Into::into));
        self
    }

    pub fn crash_at(&mut self, n: usize, mode: &str) -> &mut Self {
        self.args.extend([
            "--crash-at".to_owned(),
            n.to_string(),
            "--crash-mode".to_owned(),
            mode.to_owned(),
        ]);
        self
    }

    pub fn fail(&mut self, test: &str) -> &mut Self {
        self.args.extend(["--fail".to_owned(), test.to_owned()]);
        self
    }

    pub fn error(&mut self, test: &str) -> &mut Self {
        self.args.extend(["--error".to_owned(), test.to_owned()]);
        self
    }

    pub fn worker_id(&mut self, worker_id: &str) -> &mut Self {
        self.env(WORKER_ID_ENV, worker_id)
    }

    pub fn env(&mut self, k: &str, v: &str) -> &mut Self {
        self.envs.insert(k.into(), v.into());
        self
    }

    pub fn command(&mut self) -> Command {
        let mut command = Command::new(crash_host_bin());
        // Don't let the environment the tests run in leak into the host.
        for var in [DIR_ENV, DIALECT_ENV, WORKER_ID_ENV, COMMAND_ENV] {
            command.env_remove(var);
        }
        command.args(&self.args);
        command.envs(&self.envs);
        command
    }

    pub fn output(&mut self) -> ProcessOutput {
        ProcessOutput::from_command(self.command())
    }
}

/// Builder for an invocation of the `testreplay` CLI.
#[derive(Clone, Debug)]
pub struct ReplayCli {
    bin: Utf8PathBuf,
    args: Vec<String>,
    envs: HashMap<OsString, OsString>,
    unchecked: bool,
}

impl ReplayCli {
    pub fn for_test() -> Self {
        Self {
            bin: env!("CARGO_BIN_EXE_testreplay-dup").into(),
            args: vec!["--color".to_owned(), "never".to_owned()],
            envs: HashMap::new(),
            unchecked: false,
        }
    }

    pub fn args(&mut self, args: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, k: impl Into<OsString>, v: impl Into<OsString>) -> &mut Self {
        self.envs.insert(k.into(), v.into());
        self
    }

    pub fn unchecked(&mut self, unchecked: bool) -> &mut Self {
        self.unchecked = unchecked;
        self
    }

    pub fn output(&self) -> ProcessOutput {
        let mut command = Command::new(&self.bin);
        for var in [DIALECT_ENV, COMMAND_ENV, "TESTREPLAY_LOG", "TESTREPLAY_VERBOSE"] {
            command.env_remove(var);
        }
        command.args(&self.args);
        command.envs(&self.envs);

        let ret = ProcessOutput::from_command(command);
        if !self.unchecked && !ret.exit_status.success() {
            panic!("command failed:\n\n{ret}");
        }
        ret
    }
}

pub struct ProcessOutput {
    pub command: Command,
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn from_command(mut command: Command) -> Self {
        let output = command.output().expect("failed to execute");
        Self {
            command,
            exit_status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }

    pub fn stdout_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl fmt::Display for ProcessOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command: {:?}\nexit status: {}\n\
             --- stdout ---\n{}\n\n--- stderr ---\n{}\n",
            self.command,
            self.exit_status,
            self.stdout_as_str(),
            self.stderr_as_str(),
        )
    }
}

/// Shorthand for a start record.
pub fn start(test: &str) -> EventRecord {
    EventRecord::Start(TestIdentity::new(test))
}

/// Shorthand for an outcome record.
pub fn outcome(test: &str, outcome: OutcomeKind) -> EventRecord {
    EventRecord::Outcome(TestIdentity::new(test), outcome)
}

pub fn read_log(path: &Utf8Path) -> ExecutionLog {
    ExecutionLog::read(path).unwrap_or_else(|err| panic!("failed to read log at {path}: {err}"))
}

pub fn identities<'a>(tests: impl IntoIterator<Item = &'a TestIdentity>) -> Vec<&'a str> {
    tests.into_iter().map(TestIdentity::as_str).collect()
}
