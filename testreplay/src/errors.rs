// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, Styles};
use camino::Utf8PathBuf;
use itertools::Itertools;
use owo_colors::OwoColorize;
use std::error::Error;
use testreplay_metadata::ReplayExitCode;
use testreplay_runner::errors::{LogReadError, MaterializeError};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholders; errors are meant to be printed
// through display_to_stderr, which colorizes them.

/// An error that testreplay knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("no execution logs found")]
    NoLogsFound { paths: Vec<Utf8PathBuf> },
    #[error("failed to read execution log")]
    LogReadFailed {
        #[source]
        err: LogReadError,
    },
    #[error("failed to write replay script")]
    ScriptWriteFailed {
        #[source]
        err: MaterializeError,
    },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn log_read_failed(err: LogReadError) -> Self {
        Self::LogReadFailed { err }
    }

    pub(crate) fn script_write_failed(err: MaterializeError) -> Self {
        Self::ScriptWriteFailed { err }
    }

    pub(crate) fn write_output_error(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::NoLogsFound { .. } => ReplayExitCode::SETUP_ERROR,
            Self::LogReadFailed { .. } => ReplayExitCode::LOG_READ_FAILED,
            Self::ScriptWriteFailed { .. } => ReplayExitCode::SCRIPT_WRITE_FAILED,
            Self::WriteOutputError { .. } => ReplayExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub(crate) fn display_to_stderr(&self, styles: &Styles) {
        let mut next_error = match self {
            Self::NoLogsFound { paths } => {
                error!(
                    "no execution logs found in {}",
                    paths.iter().map(|path| path.style(styles.bold)).join(", ")
                );
                None
            }
            Self::LogReadFailed { err } => {
                error!("{err}");
                err.source()
            }
            Self::ScriptWriteFailed { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {err}");
            next_error = err.source();
        }
    }
}
