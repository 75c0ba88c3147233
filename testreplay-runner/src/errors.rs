// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by testreplay.

use crate::{identity::OutcomeKind, script::DialectKind};
use camino::Utf8PathBuf;
use std::{error::Error, fmt};
use thiserror::Error;

/// Error returned while parsing an [`OutcomeKind`] from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized outcome: {input}\n(known values: {})",
    OutcomeKind::variants().join(", "),
)]
pub struct OutcomeKindParseError {
    input: String,
}

impl OutcomeKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`DialectKind`] from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized replay script dialect: {input}\n(known values: {})",
    DialectKind::variants().join(", "),
)]
pub struct DialectParseError {
    input: String,
}

impl DialectParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Error returned while parsing a [`WorkerId`](crate::identity::WorkerId).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkerIdParseError {
    /// The worker ID was empty.
    #[error("worker ID must not be empty")]
    Empty,

    /// The worker ID was too long.
    #[error("worker ID `{input}` is longer than {max_len} bytes")]
    TooLong {
        /// The input provided.
        input: String,

        /// The maximum permitted length.
        max_len: usize,
    },

    /// The worker ID began with a dot.
    #[error("worker ID `{input}` must not start with `.`")]
    LeadingDot {
        /// The input provided.
        input: String,
    },

    /// The worker ID contained an uppercase letter.
    #[error("worker ID `{input}` must not contain uppercase letters")]
    Uppercase {
        /// The input provided.
        input: String,
    },

    /// The worker ID contained a character that is not permitted in file
    /// names.
    #[error("worker ID `{input}` contains invalid character `{ch}`")]
    InvalidChar {
        /// The input provided.
        input: String,

        /// The first invalid character.
        ch: char,
    },
}

/// An error that occurred while assembling the session configuration.
///
/// Configuration errors are fatal and are always surfaced before any test
/// runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file at `{path}`")]
    Read {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The config file could not be parsed.
    #[error("failed to parse config file at `{path}`")]
    Parse {
        /// The path to the config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// An unknown dialect was requested.
    #[error("invalid dialect in {origin}")]
    UnknownDialect {
        /// Where the value came from (a config file path or an environment
        /// variable).
        origin: String,

        /// The underlying error.
        #[source]
        error: DialectParseError,
    },

    /// An invalid worker ID was provided.
    #[error("invalid worker ID in {origin}")]
    InvalidWorkerId {
        /// Where the value came from.
        origin: String,

        /// The underlying error.
        #[source]
        error: WorkerIdParseError,
    },

    /// The replay command was empty.
    #[error("replay command in {origin} must not be empty")]
    EmptyCommand {
        /// Where the value came from.
        origin: String,
    },

    /// An environment variable was not valid UTF-8.
    #[error("environment variable `{name}` is not valid UTF-8")]
    EnvNotUnicode {
        /// The name of the environment variable.
        name: &'static str,
    },

    /// The output directory could not be created.
    #[error("failed to create output directory `{dir}`")]
    OutputDirCreate {
        /// The directory that could not be created.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while writing to an execution log.
///
/// Write errors are never retried. Once a write fails, the writer refuses all
/// further writes with [`LogWriteError::Poisoned`]; records written before the
/// failure are left untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogWriteError {
    /// The log file could not be created.
    #[error("failed to create execution log at `{path}`")]
    Create {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The parent directory of the log could not be synced after the log was
    /// created.
    #[error("failed to sync directory `{dir}` after creating execution log")]
    DirSync {
        /// The directory that could not be synced.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A record could not be serialized.
    #[error("failed to serialize execution log record")]
    Serialize {
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// A record could not be written.
    #[error("failed to write to execution log at `{path}`")]
    Write {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A record was written but could not be forced to stable storage.
    #[error("failed to sync execution log at `{path}` to disk")]
    Sync {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// An outcome was reported for a test that has no open start record.
    #[error("outcome `{outcome}` reported for test `{test}`, which was not started or has already finished")]
    OutcomeWithoutStart {
        /// The test the outcome was reported for.
        test: String,

        /// The outcome reported.
        outcome: OutcomeKind,
    },

    /// A previous write to this log failed, so no further writes are
    /// attempted.
    #[error("execution log at `{path}` is unusable after an earlier write failure")]
    Poisoned {
        /// The path to the log.
        path: Utf8PathBuf,
    },
}

/// An error that occurred while reading an execution log back from disk.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogReadError {
    /// The log file could not be opened.
    #[error("failed to open execution log at `{path}`")]
    Open {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The log file could not be read.
    #[error("failed to read execution log at `{path}`")]
    Read {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A complete line of the log could not be parsed.
    #[error("failed to parse line {line_number} of execution log at `{path}`")]
    Parse {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The 1-based line number.
        line_number: usize,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The log did not begin with a header record.
    #[error("execution log at `{path}` does not begin with a header")]
    MissingHeader {
        /// The path to the log.
        path: Utf8PathBuf,
    },

    /// A header record appeared somewhere other than the first line.
    #[error("unexpected header on line {line_number} of execution log at `{path}`")]
    UnexpectedHeader {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The 1-based line number.
        line_number: usize,
    },

    /// The log was written in a format version this build does not
    /// understand.
    #[error(
        "execution log at `{path}` has format version {version}, \
         but only version {supported} is supported"
    )]
    UnsupportedVersion {
        /// The path to the log.
        path: Utf8PathBuf,

        /// The version found in the log.
        version: u32,

        /// The version supported by this build.
        supported: u32,
    },

    /// A directory could not be scanned for logs.
    #[error("failed to list execution logs in `{dir}`")]
    Discover {
        /// The directory being scanned.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A file in a scanned directory had a non-UTF-8 name.
    #[error("execution log directory `{dir}` contains a non-UTF-8 file name")]
    NonUtf8Path {
        /// The directory being scanned.
        dir: Utf8PathBuf,
    },
}

/// An error that occurred while writing a replay script.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaterializeError {
    /// The script directory could not be created.
    #[error("failed to create directory `{dir}` for replay script")]
    DirCreate {
        /// The directory that could not be created.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The script could not be written.
    #[error("failed to write replay script to `{path}`")]
    Write {
        /// The path to the script.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<std::io::Error>,
    },

    /// A test identity contains a character the dialect can't quote.
    #[error(
        "test `{}` contains {ch:?}, which can't be represented in a {dialect} script",
        .test.escape_debug()
    )]
    Unrepresentable {
        /// The test identity.
        test: String,

        /// The name of the dialect.
        dialect: &'static str,

        /// The offending character.
        ch: char,
    },

    /// The script's permissions could not be set.
    #[error("failed to mark replay script at `{path}` as executable")]
    SetPermissions {
        /// The path to the script.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while starting a recording session.
///
/// These errors abort session setup: recording was explicitly requested, so
/// running tests without it would silently lose the crash record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionStartError {
    /// The session was already started.
    #[error("recording session already started")]
    AlreadyStarted,

    /// The output directory could not be prepared.
    #[error("failed to set up replay recording")]
    Config(#[from] ConfigError),

    /// The execution log could not be opened.
    #[error("failed to open execution log")]
    LogOpen(#[from] LogWriteError),
}

/// Displays an error along with its chain of sources, one per line.
///
/// Used when an error is logged rather than returned.
pub struct DisplayErrorChain<E> {
    error: E,
    initial_indent: usize,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self {
            error,
            initial_indent: 0,
        }
    }

    /// Creates a new `DisplayErrorChain` with every line indented by
    /// `initial_indent` spaces.
    pub fn new_with_initial_indent(initial_indent: usize, error: E) -> Self {
        Self {
            error,
            initial_indent,
        }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = " ".repeat(self.initial_indent);
        write!(f, "{indent}{}", self.error)?;

        let mut source = self.error.source();
        while let Some(error) = source {
            write!(f, "\n{indent}  caused by:\n{indent}  - {error}")?;
            source = error.source();
        }

        Ok(())
    }
}
