// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording session management.
//!
//! A host test framework drives a recorder through the [`SessionHooks`]
//! interface: once at session start, twice per test, and once at session end.
//! [`ReplayRecorder`] is the implementation that writes an execution log as
//! tests run and a replay script when the session finishes cleanly.
//!
//! The recorder is an ordinary owned value. Hosts construct one per worker
//! process and pass it to wherever their test lifecycle hooks live.

use crate::{
    config::SessionConfig,
    errors::{DisplayErrorChain, LogWriteError, MaterializeError, SessionStartError},
    identity::{OutcomeKind, TestIdentity},
    log::LogWriter,
    partition::{ReplayPaths, ensure_base_dir},
    script::{DialectKind, materialize},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use tracing::{debug, info, warn};

/// The notifications a host test framework sends during a session.
pub trait SessionHooks {
    /// Called once, before any test runs.
    ///
    /// An error here means recording was requested but cannot happen; the
    /// host should abort the run.
    fn on_session_start(&mut self, config: &SessionConfig) -> Result<(), SessionStartError>;

    /// Called immediately before `test` runs.
    ///
    /// When this returns `Ok`, the start is on stable storage.
    fn on_test_start(&mut self, test: &TestIdentity) -> Result<(), LogWriteError>;

    /// Called after `test` finishes with `outcome`.
    fn on_test_finish(
        &mut self,
        test: &TestIdentity,
        outcome: OutcomeKind,
    ) -> Result<(), LogWriteError>;

    /// Called once, after all tests have run.
    ///
    /// Problems at this stage never invalidate the execution log, so they are
    /// reported as warnings rather than errors.
    fn on_session_finish(&mut self) -> SessionFinishResult;
}

/// Records test execution for one worker process.
#[derive(Debug, Default)]
pub struct ReplayRecorder {
    state: RecorderState,
    status_message: Option<String>,
}

#[derive(Debug, Default)]
enum RecorderState {
    #[default]
    NotStarted,
    Disabled,
    Active(ActiveSession),
    Finished,
}

#[derive(Debug)]
struct ActiveSession {
    paths: ReplayPaths,
    dialect: DialectKind,
    command: String,
    writer: LogWriter,
}

impl ReplayRecorder {
    /// Creates a recorder that has not yet been started.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder and starts a session with `config`.
    pub fn start(config: &SessionConfig) -> Result<Self, SessionStartError> {
        let mut recorder = Self::new();
        recorder.on_session_start(config)?;
        Ok(recorder)
    }

    /// Returns the status line emitted at session start, if recording is
    /// active.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Returns true if the session is recording.
    pub fn is_active(&self) -> bool {
        matches!(self.state, RecorderState::Active(_))
    }

    /// Returns the path to the execution log, if the session is recording.
    pub fn log_path(&self) -> Option<&Utf8Path> {
        match &self.state {
            RecorderState::Active(session) => Some(session.writer.path()),
            _ => None,
        }
    }
}

impl SessionHooks for ReplayRecorder {
    fn on_session_start(&mut self, config: &SessionConfig) -> Result<(), SessionStartError> {
        if !matches!(self.state, RecorderState::NotStarted) {
            return Err(SessionStartError::AlreadyStarted);
        }
        config.validate()?;

        let Some(paths) = config.paths() else {
            debug!("no output directory configured, test replay recording is disabled");
            self.state = RecorderState::Disabled;
            return Ok(());
        };

        ensure_base_dir(paths.base_dir())?;
        let writer = LogWriter::open(&paths.log_path(), paths.worker_id().cloned())?;

        let status = format!(
            "replay dir: {} ({})",
            paths.base_dir(),
            config.dialect.dialect().extension(),
        );
        info!("{status}");
        self.status_message = Some(status);

        self.state = RecorderState::Active(ActiveSession {
            paths,
            dialect: config.dialect,
            command: config.command.clone(),
            writer,
        });
        Ok(())
    }

    fn on_test_start(&mut self, test: &TestIdentity) -> Result<(), LogWriteError> {
        match &mut self.state {
            RecorderState::Active(session) => session.writer.record_start(test),
            _ => Ok(()),
        }
    }

    fn on_test_finish(
        &mut self,
        test: &TestIdentity,
        outcome: OutcomeKind,
    ) -> Result<(), LogWriteError> {
        match &mut self.state {
            RecorderState::Active(session) => session.writer.record_outcome(test, outcome),
            _ => Ok(()),
        }
    }

    fn on_session_finish(&mut self) -> SessionFinishResult {
        let mut result = SessionFinishResult::default();

        let mut session = match std::mem::replace(&mut self.state, RecorderState::Finished) {
            RecorderState::Active(session) => session,
            RecorderState::NotStarted => {
                self.state = RecorderState::NotStarted;
                return result;
            }
            // Disabled or already finished: nothing was written.
            RecorderState::Disabled | RecorderState::Finished => return result,
        };

        if session.writer.is_poisoned() {
            result.warnings.push(SessionFinishWarning::LogIncomplete {
                path: session.writer.path().to_owned(),
                unconfirmed_start: session.writer.unconfirmed_start().cloned(),
            });
        }

        let dialect = session.dialect.dialect();
        let script_path = session.paths.script_path(dialect.extension());
        let started = session.writer.started();
        match materialize(started, &script_path, &session.command, dialect) {
            Ok(()) => {
                result.test_count = started.len();
                result.script_path = Some(script_path);
            }
            Err(error) => {
                result
                    .warnings
                    .push(SessionFinishWarning::MaterializeFailed(error));
            }
        }

        session.writer.close();
        result
    }
}

/// The result of finishing a recording session.
#[derive(Debug, Default)]
pub struct SessionFinishResult {
    /// The replay script that was written, if any.
    pub script_path: Option<Utf8PathBuf>,

    /// The number of test starts included in the replay script.
    pub test_count: usize,

    /// Non-fatal problems encountered while finishing.
    pub warnings: Vec<SessionFinishWarning>,
}

impl SessionFinishResult {
    /// Logs the script location and any warnings.
    pub fn log(&self) {
        if let Some(script_path) = &self.script_path {
            debug!(
                "wrote replay script for {} tests to {script_path}",
                self.test_count
            );
        }
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

/// A non-fatal warning produced while finishing a recording session.
#[derive(Debug)]
pub enum SessionFinishWarning {
    /// A write to the execution log failed earlier in the session, so the log
    /// is missing records.
    LogIncomplete {
        /// The path to the execution log.
        path: Utf8PathBuf,

        /// The test whose start failed to write. Its start may or may not be
        /// in the log, and it is not in the replay script.
        unconfirmed_start: Option<TestIdentity>,
    },

    /// The replay script couldn't be written. The execution log is
    /// unaffected.
    MaterializeFailed(MaterializeError),
}

impl fmt::Display for SessionFinishWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogIncomplete {
                path,
                unconfirmed_start,
            } => {
                write!(
                    f,
                    "execution log at {path} is missing records after an earlier write failure"
                )?;
                if let Some(test) = unconfirmed_start {
                    write!(
                        f,
                        " (start of `{test}` may or may not have been recorded, \
                         and it is not in the replay script)"
                    )?;
                }
                Ok(())
            }
            Self::MaterializeFailed(error) => write!(
                f,
                "session finished but the replay script was not written: {}",
                DisplayErrorChain::new(error)
            ),
        }
    }
}
