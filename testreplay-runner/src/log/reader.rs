// Copyright (c) The testreplay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading execution logs back from disk, typically in a new process after a
//! crash.

use super::format::{EventRecord, LOG_FORMAT_VERSION, LogHeader, LogLine};
use crate::{errors::LogReadError, identity::TestIdentity};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
};
use tracing::warn;

/// An execution log read back from disk.
#[derive(Clone, Debug)]
pub struct ExecutionLog {
    path: Utf8PathBuf,
    header: LogHeader,
    records: Vec<EventRecord>,
    torn_tail: bool,
}

impl ExecutionLog {
    /// Reads and parses the log at `path`.
    ///
    /// A final line without a terminating newline is the remnant of a write
    /// interrupted by a crash; it is ignored. Outcome records that don't
    /// follow a matching start are dropped with a warning.
    pub fn read(path: &Utf8Path) -> Result<Self, LogReadError> {
        let file = File::open(path).map_err(|error| LogReadError::Open {
            path: path.to_owned(),
            error,
        })?;
        let mut reader = BufReader::new(file);

        let mut header = None;
        let mut records = Vec::new();
        let mut open_starts: HashMap<TestIdentity, usize> = HashMap::new();
        let mut torn_tail = false;

        let mut buf = Vec::new();
        let mut line_number = 0;
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|error| LogReadError::Read {
                    path: path.to_owned(),
                    error,
                })?;
            if read == 0 {
                break;
            }
            line_number += 1;

            if buf.last() != Some(&b'\n') {
                warn!(
                    "ignoring incomplete final line {line_number} of execution log at {path} \
                     (the writing process was likely terminated mid-write)"
                );
                torn_tail = true;
                break;
            }

            let line: LogLine =
                serde_json::from_slice(&buf).map_err(|error| LogReadError::Parse {
                    path: path.to_owned(),
                    line_number,
                    error,
                })?;

            match (line, header.is_some()) {
                (LogLine::Header(h), false) => {
                    if h.format_version != LOG_FORMAT_VERSION {
                        return Err(LogReadError::UnsupportedVersion {
                            path: path.to_owned(),
                            version: h.format_version,
                            supported: LOG_FORMAT_VERSION,
                        });
                    }
                    header = Some(h);
                }
                (LogLine::Header(_), true) => {
                    return Err(LogReadError::UnexpectedHeader {
                        path: path.to_owned(),
                        line_number,
                    });
                }
                (_, false) => {
                    return Err(LogReadError::MissingHeader {
                        path: path.to_owned(),
                    });
                }
                (LogLine::Start { test }, true) => {
                    *open_starts.entry(test.clone()).or_default() += 1;
                    records.push(EventRecord::Start(test));
                }
                (LogLine::Outcome { test, outcome }, true) => {
                    match open_starts.get_mut(&test) {
                        Some(count) => {
                            *count -= 1;
                            if *count == 0 {
                                open_starts.remove(&test);
                            }
                            records.push(EventRecord::Outcome(test, outcome));
                        }
                        None => {
                            warn!(
                                "ignoring outcome `{outcome}` for `{test}` on line {line_number} \
                                 of execution log at {path}: no matching start"
                            );
                        }
                    }
                }
            }
        }

        // An empty file is a log whose header write never completed.
        let header = header.ok_or_else(|| LogReadError::MissingHeader {
            path: path.to_owned(),
        })?;

        Ok(Self {
            path: path.to_owned(),
            header,
            records,
            torn_tail,
        })
    }

    /// Returns the path this log was read from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the log's header.
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Returns all records, in the order they were written.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Returns the tests that were started, in order. Repeats are preserved.
    pub fn started(&self) -> impl Iterator<Item = &TestIdentity> + '_ {
        self.records.iter().filter_map(|record| match record {
            EventRecord::Start(test) => Some(test),
            EventRecord::Outcome(..) => None,
        })
    }

    /// Returns true if the log ended with an incomplete line.
    pub fn has_torn_tail(&self) -> bool {
        self.torn_tail
    }
}
