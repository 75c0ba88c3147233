// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk representation of execution log lines.

use crate::identity::{OutcomeKind, TestIdentity, WorkerId};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The current execution log format version.
///
/// Bump this when making an incompatible change to [`LogLine`].
pub const LOG_FORMAT_VERSION: u32 = 1;

/// Metadata written as the first line of every execution log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LogHeader {
    /// The format version the log was written with.
    pub format_version: u32,

    /// The worker that owns this log, or `None` for single-process runs.
    pub worker_id: Option<WorkerId>,

    /// When the log was opened.
    pub started_at: DateTime<FixedOffset>,
}

impl LogHeader {
    pub(super) fn new(worker_id: Option<WorkerId>, started_at: DateTime<FixedOffset>) -> Self {
        Self {
            format_version: LOG_FORMAT_VERSION,
            worker_id,
            started_at,
        }
    }
}

/// A single test event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventRecord {
    /// A test is about to run.
    Start(TestIdentity),

    /// A test finished with the given outcome.
    Outcome(TestIdentity, OutcomeKind),
}

impl EventRecord {
    /// Returns the test this record is about.
    pub fn test(&self) -> &TestIdentity {
        match self {
            Self::Start(test) | Self::Outcome(test, _) => test,
        }
    }
}

/// One line of the log, as serialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub(super) enum LogLine {
    Header(LogHeader),
    Start {
        test: TestIdentity,
    },
    Outcome {
        test: TestIdentity,
        outcome: OutcomeKind,
    },
}

impl LogLine {
    /// Serializes this line, including the trailing newline, into a single
    /// buffer so that it can be written with one call.
    pub(super) fn to_line_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl From<EventRecord> for LogLine {
    fn from(record: EventRecord) -> Self {
        match record {
            EventRecord::Start(test) => Self::Start { test },
            EventRecord::Outcome(test, outcome) => Self::Outcome { test, outcome },
        }
    }
}
